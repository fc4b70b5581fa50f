//! Per-run entities: tenant context, steps, results, and agent state (§3, §4.6).

use crate::budget::{Budget, BudgetUsage};
use crate::duration::DurationMs;
use crate::error::ErrorCode;
use crate::id::{RawOutputKey, TenantId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Default number of trailing `history` entries included in the prompt
/// projection (§4.2, §4.6).
pub const HISTORY_WINDOW: usize = 8;

/// Identity and ambient context for one tenant's run.
///
/// Credentials are resolved out-of-band (§6.2) and referenced here only by
/// an opaque handle — the runtime never holds raw secret material. Logger
/// binding is realized as a `tracing` span carrying `user_id`, not a stored
/// field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantContext {
    /// Stable, non-empty tenant/user identifier for the run.
    pub user_id: TenantId,
    /// Opaque reference to ambient credentials resolved out-of-band.
    #[serde(default)]
    pub credentials_handle: Option<String>,
}

impl TenantContext {
    /// Construct a tenant context with no credentials handle attached.
    pub fn new(user_id: impl Into<TenantId>) -> Self {
        Self {
            user_id: user_id.into(),
            credentials_handle: None,
        }
    }
}

/// A compact tool descriptor surfaced to the planner by `search` and kept
/// in `AgentState.search_results` (§4.5.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// `provider.name`, unique within a tenant's index.
    pub tool_id: String,
    /// The provider half of `tool_id`.
    pub server: String,
    /// Pythonic string of the exposed parameters, e.g. `(to, subject, body)`.
    pub signature: String,
    /// Free-text description parsed from the wrapper's doc comment.
    pub description: String,
    /// Parameter name -> `"<type> (required|optional, default=X) - <doc>"`.
    pub input_params: HashMap<String, String>,
    /// Output fields after hierarchical fold-marker summarization (§4.5.3).
    pub output_fields: Vec<String>,
    /// Whether any field was replaced by a fold marker.
    pub has_hidden_fields: bool,
}

/// One entry in `AgentState.history` (§3). Appended once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStep {
    /// Monotonically increasing step id, starting at 0.
    pub step_id: u32,
    /// The command's kind (`search`/`tool`/`sandbox`/`finish`/`fail`).
    #[serde(rename = "type")]
    pub kind: String,
    /// The reasoning string carried on the command.
    pub reasoning: String,
    /// The command as submitted, for audit/replay.
    pub command: serde_json::Value,
    /// The bounded observation surfaced to later prompts (§4.7).
    pub observation_preview: serde_json::Value,
    /// Key into `AgentState.raw_outputs`, if the full value was stored.
    pub raw_output_key: Option<RawOutputKey>,
    /// Error message, if this step failed.
    pub error: Option<String>,
    /// When the step started, milliseconds since run start.
    pub started_at: DurationMs,
    /// When the step ended, milliseconds since run start.
    pub ended_at: DurationMs,
}

/// The result of executing one command, before being folded into an
/// `ExecutionStep` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Whether the step succeeded.
    pub success: bool,
    /// The command's kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// The full (already-trimmed per §4.4) observation.
    pub observation: serde_json::Value,
    /// The preview surfaced to the prompt, identical to `observation`
    /// unless the value was large enough to be moved to `raw_outputs`.
    pub preview: serde_json::Value,
    /// Error message, if `success` is false.
    pub error: Option<String>,
    /// Key into `AgentState.raw_outputs`, if the full value was stored.
    pub raw_output_key: Option<RawOutputKey>,
}

/// Normalized response from a Provider Registry invocation (§3, §6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Whether the call succeeded.
    pub successful: bool,
    /// Response payload. Always a map, possibly empty.
    pub data: serde_json::Map<String, serde_json::Value>,
    /// Error message. Non-empty whenever `successful` is false.
    pub error: Option<String>,
    /// Optional unprocessed provider payload, for debugging.
    pub raw: Option<serde_json::Value>,
}

impl ActionResponse {
    /// Build a successful response from a data map.
    pub fn ok(data: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            successful: true,
            data,
            error: None,
            raw: None,
        }
    }

    /// Build a failed response with the given error message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            successful: false,
            data: serde_json::Map::new(),
            error: Some(error.into()),
            raw: None,
        }
    }
}

/// Result of one sandbox subprocess invocation (§3, §6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxResult {
    /// Whether the run completed without error and without timing out.
    pub success: bool,
    /// The plan's return value (`{}` if `None`), parsed from the sentinel line.
    pub result: Option<serde_json::Value>,
    /// Captured stdout log lines up to the sentinel (or up to the kill, on timeout).
    pub logs: Vec<String>,
    /// Error message, if any.
    pub error: Option<String>,
    /// Whether the subprocess was killed for exceeding its timeout.
    pub timed_out: bool,
}

/// Which terminal command ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// The planner emitted `finish`.
    Finish,
    /// The planner emitted `fail`.
    Fail,
}

/// The complete, reproducible outcome of one run (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpTaskResult {
    /// `true` iff the run reached `terminal == Finish`.
    pub success: bool,
    /// Human-readable one-sentence summary.
    pub final_summary: String,
    /// Values too large to inline in previews, keyed by label.
    pub raw_outputs: HashMap<String, serde_json::Value>,
    /// Final budget usage snapshot.
    pub budget_usage: BudgetUsage,
    /// All captured log lines (sandbox stdout, internal diagnostics).
    pub logs: Vec<String>,
    /// The full ordered step history.
    pub steps: Vec<ExecutionStep>,
    /// Original error message, when available.
    pub error: Option<String>,
    /// Machine-readable failure code, when `success` is false.
    pub error_code: Option<ErrorCode>,
}

/// Mutable state for one run, exclusively owned by its orchestrator (§5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    /// The natural-language task.
    pub task: String,
    /// Tenant identity and ambient context.
    pub tenant: TenantContext,
    /// Immutable resource limits for this run.
    pub budget: Budget,
    /// Monotonically non-decreasing usage counters.
    pub usage: BudgetUsage,
    /// Compact provider -> tool-name tree, seeded from the Tool Index.
    pub inventory_view: serde_json::Value,
    /// Tool ids made eligible for use by a prior `search`.
    pub discovered_tools: HashSet<String>,
    /// Most recent compact descriptor per discovered tool id.
    pub search_results: Vec<ToolDescriptor>,
    /// Append-only ordered step history.
    pub history: Vec<ExecutionStep>,
    /// Values moved out of previews for being too large, keyed by label.
    pub raw_outputs: HashMap<String, serde_json::Value>,
    /// Captured log lines (sandbox stdout, internal diagnostics).
    pub logs: Vec<String>,
    /// Caller-supplied context placed into the prompt verbatim.
    pub extra_context: Option<serde_json::Value>,
    /// Which terminal command ended the run, if any.
    pub terminal: Option<Terminal>,
    /// Set once `terminal` is set.
    pub final_summary: Option<String>,
    /// Set once `terminal == Fail`, or on an internal failure.
    pub error: Option<String>,
    /// Consecutive empty `search` results seen so far (implementation
    /// bookkeeping for `discovery_failed`, not itself part of the spec's
    /// data model table).
    pub consecutive_empty_searches: u32,
    /// Consecutive `ProtocolError`s seen so far (bookkeeping for
    /// `protocol_error`).
    pub consecutive_protocol_errors: u32,
}

impl AgentState {
    /// Create a fresh `AgentState` for a new run.
    pub fn new(
        task: impl Into<String>,
        tenant: TenantContext,
        budget: Budget,
        inventory_view: serde_json::Value,
        extra_context: Option<serde_json::Value>,
    ) -> Self {
        Self {
            task: task.into(),
            tenant,
            budget,
            usage: BudgetUsage::default(),
            inventory_view,
            discovered_tools: HashSet::new(),
            search_results: Vec::new(),
            history: Vec::new(),
            raw_outputs: HashMap::new(),
            logs: Vec::new(),
            extra_context,
            terminal: None,
            final_summary: None,
            error: None,
            consecutive_empty_searches: 0,
            consecutive_protocol_errors: 0,
        }
    }

    /// Always-allowed tool id, exempt from discovery-before-use (§4.4.2).
    pub fn is_always_allowed(tool_id: &str) -> bool {
        tool_id == "toolbox.inspect_tool_output"
    }

    /// Whether `tool_id` may currently be used (§4.4.2).
    pub fn can_use(&self, tool_id: &str) -> bool {
        Self::is_always_allowed(tool_id) || self.discovered_tools.contains(tool_id)
    }

    /// Render the deterministic prompt projection (§4.6). Key order is
    /// stable so repeated runs over the same state produce byte-identical
    /// prompts.
    pub fn build_prompt_state(&self) -> serde_json::Value {
        let history_window: Vec<serde_json::Value> = self
            .history
            .iter()
            .rev()
            .take(HISTORY_WINDOW)
            .rev()
            .map(|step| {
                serde_json::json!({
                    "type": step.kind,
                    "reasoning": step.reasoning,
                    "preview": step.observation_preview,
                })
            })
            .collect();

        let mut obj = serde_json::Map::new();
        obj.insert("task".into(), serde_json::Value::String(self.task.clone()));
        obj.insert(
            "budget".into(),
            serde_json::to_value(self.budget).unwrap_or(serde_json::Value::Null),
        );
        obj.insert(
            "usage".into(),
            serde_json::to_value(self.usage).unwrap_or(serde_json::Value::Null),
        );
        obj.insert("inventory_view".into(), self.inventory_view.clone());
        obj.insert(
            "search_results".into(),
            serde_json::to_value(&self.search_results).unwrap_or(serde_json::Value::Null),
        );
        obj.insert(
            "history_window".into(),
            serde_json::Value::Array(history_window),
        );
        obj.insert(
            "extra_context".into(),
            self.extra_context.clone().unwrap_or(serde_json::Value::Null),
        );
        serde_json::Value::Object(obj)
    }

    /// Merge `outputs` into `raw_outputs` without overwriting existing keys
    /// (§4.4.4, `finish`'s shallow merge rule).
    pub fn merge_finish_outputs(&mut self, outputs: serde_json::Value) {
        if let serde_json::Value::Object(map) = outputs {
            for (k, v) in map {
                self.raw_outputs.entry(k).or_insert(v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AgentState {
        AgentState::new(
            "send an email",
            TenantContext::new("acme"),
            Budget::default(),
            serde_json::json!({}),
            None,
        )
    }

    #[test]
    fn always_allowed_tool_bypasses_discovery() {
        let s = state();
        assert!(s.can_use("toolbox.inspect_tool_output"));
        assert!(!s.can_use("gmail.gmail_search"));
    }

    #[test]
    fn prompt_projection_key_order_is_stable() {
        let s = state();
        let v = s.build_prompt_state();
        let keys: Vec<&String> = v.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec![
                "task",
                "budget",
                "usage",
                "inventory_view",
                "search_results",
                "history_window",
                "extra_context"
            ]
        );
    }

    #[test]
    fn finish_outputs_do_not_overwrite_existing_keys() {
        let mut s = state();
        s.raw_outputs.insert("k".into(), serde_json::json!("first"));
        s.merge_finish_outputs(serde_json::json!({"k": "second", "k2": "new"}));
        assert_eq!(s.raw_outputs["k"], serde_json::json!("first"));
        assert_eq!(s.raw_outputs["k2"], serde_json::json!("new"));
    }

    #[test]
    fn history_window_caps_at_default_n() {
        let mut s = state();
        for i in 0..20 {
            s.history.push(ExecutionStep {
                step_id: i,
                kind: "search".into(),
                reasoning: "r".into(),
                command: serde_json::json!({}),
                observation_preview: serde_json::json!([]),
                raw_output_key: None,
                error: None,
                started_at: DurationMs::ZERO,
                ended_at: DurationMs::ZERO,
            });
        }
        let v = s.build_prompt_state();
        let window = v["history_window"].as_array().unwrap();
        assert_eq!(window.len(), HISTORY_WINDOW);
    }
}
