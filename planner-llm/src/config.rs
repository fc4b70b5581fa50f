//! Configuration for the Planner LLM Adapter.

/// Static configuration for [`crate::next_command`].
///
/// Per-run overrides, if ever needed, belong on the caller's side — this
/// struct only holds the defaults used when none are supplied.
#[derive(Debug, Clone)]
pub struct PlannerLlmConfig {
    /// Default model identifier sent on every request.
    pub default_model: String,
    /// Default maximum output tokens per provider call.
    pub default_max_tokens: u32,
    /// Default sampling temperature. Low by default — the planner is
    /// producing a structured command, not prose.
    pub default_temperature: f64,
}

impl Default for PlannerLlmConfig {
    fn default() -> Self {
        Self {
            default_model: "claude-3-5-sonnet-20241022".into(),
            default_max_tokens: 4096,
            default_temperature: 0.0,
        }
    }
}
