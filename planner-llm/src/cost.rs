//! Per-model cost-rate table for best-effort `estimated_cost_usd` (§4.2).

use crate::types::TokenUsage;
use rust_decimal::Decimal;

/// USD cost per million tokens, input and output priced separately.
#[derive(Debug, Clone, Copy)]
pub struct CostRate {
    /// USD per million input tokens.
    pub input_per_million: Decimal,
    /// USD per million output tokens.
    pub output_per_million: Decimal,
}

fn rate(input: i64, output: i64) -> CostRate {
    // Scale 2 — both arguments are whole-cent USD amounts per million tokens.
    CostRate { input_per_million: Decimal::new(input, 2), output_per_million: Decimal::new(output, 2) }
}

fn known_rates() -> [(&'static str, CostRate); 3] {
    [
        ("claude-3-5-sonnet-20241022", rate(300, 1500)),
        ("claude-3-5-haiku-20241022", rate(80, 400)),
        ("claude-3-opus-20240229", rate(1500, 7500)),
    ]
}

/// Fallback rate for a model not in [`known_rates`], priced at the known
/// table's cheapest entry so an unrecognized model never silently inflates
/// `estimated_llm_cost_usd`.
fn default_rate() -> CostRate {
    rate(80, 400)
}

/// Look up the cost rate for `model`, falling back to [`default_rate`].
pub fn rate_for(model: &str) -> CostRate {
    known_rates()
        .into_iter()
        .find(|(name, _)| *name == model)
        .map(|(_, rate)| rate)
        .unwrap_or_else(default_rate)
}

/// Best-effort cost estimate for one provider call.
pub fn estimate_cost(model: &str, usage: &TokenUsage) -> Decimal {
    let rate = rate_for(model);
    let million = Decimal::from(1_000_000u32);
    let input_cost = Decimal::from(usage.input_tokens) * rate.input_per_million / million;
    let output_cost = Decimal::from(usage.output_tokens) * rate.output_per_million / million;
    input_cost + output_cost
}
