//! The command schema emitted by the Planner LLM (§4.3).

use serde::{Deserialize, Serialize};

/// Requested level of detail for a `search` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    /// Compact descriptor only.
    Summary,
    /// Compact descriptor plus the full output schema.
    Full,
}

/// One parsed planner command. Every variant carries a non-empty
/// `reasoning` string (§4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Discover tools matching a query.
    Search {
        /// Why the planner is searching.
        reasoning: String,
        /// Non-empty search query.
        query: String,
        /// Optional requested detail level.
        #[serde(default)]
        detail_level: Option<DetailLevel>,
        /// Optional result count cap, 1..=50.
        #[serde(default)]
        limit: Option<u32>,
    },
    /// Invoke a previously-discovered tool.
    Tool {
        /// Why the planner is invoking this tool.
        reasoning: String,
        /// `provider.name`, must be in `discovered_tools`.
        tool_id: String,
        /// Must equal the provider half of `tool_id`.
        server: String,
        /// Tool input arguments (possibly empty).
        args: serde_json::Value,
    },
    /// Execute a sandboxed code snippet.
    Sandbox {
        /// Why the planner is running this code.
        reasoning: String,
        /// Non-empty label for this sandbox run.
        label: String,
        /// Plain body injected into the fixed async `main` scaffold.
        code: String,
    },
    /// Successfully complete the run.
    Finish {
        /// Why the planner considers the task complete.
        reasoning: String,
        /// Human-readable summary of the outcome.
        summary: String,
        /// Optional outputs merged into `AgentState.raw_outputs`.
        #[serde(default)]
        outputs: Option<serde_json::Value>,
    },
    /// Abandon the run.
    Fail {
        /// Why the planner is giving up.
        reasoning: String,
        /// Human-readable reason.
        reason: String,
    },
}

impl Command {
    /// The command's `type` discriminant, as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Search { .. } => "search",
            Command::Tool { .. } => "tool",
            Command::Sandbox { .. } => "sandbox",
            Command::Finish { .. } => "finish",
            Command::Fail { .. } => "fail",
        }
    }

    /// The command's `reasoning` field.
    pub fn reasoning(&self) -> &str {
        match self {
            Command::Search { reasoning, .. }
            | Command::Tool { reasoning, .. }
            | Command::Sandbox { reasoning, .. }
            | Command::Finish { reasoning, .. }
            | Command::Fail { reasoning, .. } => reasoning,
        }
    }

    /// Whether this command's kind counts against `max_tool_calls`.
    pub fn is_tool(&self) -> bool {
        matches!(self, Command::Tool { .. })
    }

    /// Whether this command's kind counts against `max_code_runs`.
    pub fn is_sandbox(&self) -> bool {
        matches!(self, Command::Sandbox { .. })
    }

    /// Whether this command terminates the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Command::Finish { .. } | Command::Fail { .. })
    }
}

/// Raised by the Command Parser when the planner's text output does not
/// match the command schema (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolError {
    /// Human-readable description of what was wrong.
    pub message: String,
    /// A ≤ 200-char preview of the offending text.
    pub preview: String,
}

impl ProtocolError {
    /// Build a `ProtocolError`, truncating `raw` to a 200-char preview.
    pub fn new(message: impl Into<String>, raw: &str) -> Self {
        let preview: String = raw.chars().take(200).collect();
        Self {
            message: message.into(),
            preview,
        }
    }
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?}", self.message, self.preview)
    }
}

impl std::error::Error for ProtocolError {}
