#![deny(missing_docs)]
//! Planner LLM Adapter — §4.2.
//!
//! Renders an [`AgentState`] into a [`ProviderRequest`], calls a
//! [`Provider`] with retry-with-backoff, and turns its response into a
//! [`Completion`] carrying a best-effort cost estimate.

pub mod config;
pub mod cost;
pub mod prompt;
pub mod provider;
pub mod retry;
pub mod types;

pub use config::PlannerLlmConfig;
pub use cost::{estimate_cost, rate_for, CostRate};
pub use prompt::{render_request, SYSTEM_PROMPT};
pub use provider::{Provider, ProviderError};
pub use retry::complete_with_retry;
pub use types::*;

use planner_core::{AgentState, LlmError};
use rust_decimal::Decimal;

/// Outcome of one Planner LLM Adapter call: the candidate command text plus
/// the cost metrics the orchestrator folds into `BudgetUsage`.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Raw model output — expected to parse as a single JSON command (§4.3).
    pub text: String,
    /// Model that actually served the request.
    pub model: String,
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens generated.
    pub output_tokens: u64,
    /// Best-effort cost estimate in USD for this single call.
    pub estimated_cost_usd: Decimal,
}

/// Ask `provider` for the next command given `state`. Retries transient
/// provider errors, then raises [`LlmError::Unavailable`] for the
/// orchestrator to convert into `error_code = "llm_unavailable"`.
pub async fn next_command<P: Provider>(
    provider: &P,
    state: &AgentState,
    config: &PlannerLlmConfig,
) -> Result<Completion, LlmError> {
    let request = render_request(state, config);
    let response = complete_with_retry(provider, request)
        .await
        .map_err(|e| LlmError::Unavailable(e.to_string()))?;

    let estimated_cost_usd =
        response.cost.unwrap_or_else(|| estimate_cost(&response.model, &response.usage));

    Ok(Completion {
        text: response.text,
        model: response.model,
        input_tokens: response.usage.input_tokens,
        output_tokens: response.usage.output_tokens,
        estimated_cost_usd,
    })
}
