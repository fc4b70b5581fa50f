//! Error taxonomy for the planner runtime.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable terminal-failure codes surfaced on `MCPTaskResult`.
///
/// Step-level failures (tool/sandbox) are *not* part of this taxonomy —
/// they are recorded on the failing `ExecutionStep` and do not end the run.
/// Only run-level (terminal) failures get an `ErrorCode`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Any budget axis reached or exceeded its limit.
    BudgetExhausted,
    /// Three or more consecutive unparseable planner responses.
    ProtocolError,
    /// LLM calls failed after exhausting retries.
    LlmUnavailable,
    /// Planner tried to use a tool after repeated empty searches.
    DiscoveryFailed,
    /// Executor validation: `tool_id` not present in the Tool Index.
    PlannerUsedUnknownTool,
    /// Executor validation: `server` field doesn't match the tool's provider.
    PlannerUsedUnknownServer,
    /// Executor validation: `tool_id` not yet surfaced by a `search`.
    PlannerUsedUndiscoveredTool,
    /// Submitted sandbox code failed to tokenize as a recognized statement.
    SandboxSyntaxError,
    /// Sandbox code redefined `main`, called `asyncio.run`, or used an
    /// `if __name__` guard.
    SandboxInvalidBody,
    /// Sandbox subprocess exited with a non-sentinel error.
    SandboxRuntimeError,
    /// Sandbox subprocess exceeded its wall-clock timeout.
    SandboxTimeout,
    /// Sandbox returned `None`/an empty map after invoking a tool.
    SandboxEmptyResult,
    /// Planner emitted a `fail` command.
    PlannerFailed,
    /// The run was cancelled cooperatively.
    Cancelled,
    /// The host rejected the run due to a concurrency cap.
    Overloaded,
    /// An unrecoverable internal exception.
    InternalError,
}

impl ErrorCode {
    /// The wire string for this code, matching §7 of the specification
    /// exactly (also produced by `Display`/serde).
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BudgetExhausted => "budget_exhausted",
            ErrorCode::ProtocolError => "protocol_error",
            ErrorCode::LlmUnavailable => "llm_unavailable",
            ErrorCode::DiscoveryFailed => "discovery_failed",
            ErrorCode::PlannerUsedUnknownTool => "planner_used_unknown_tool",
            ErrorCode::PlannerUsedUnknownServer => "planner_used_unknown_server",
            ErrorCode::PlannerUsedUndiscoveredTool => "planner_used_undiscovered_tool",
            ErrorCode::SandboxSyntaxError => "sandbox_syntax_error",
            ErrorCode::SandboxInvalidBody => "sandbox_invalid_body",
            ErrorCode::SandboxRuntimeError => "sandbox_runtime_error",
            ErrorCode::SandboxTimeout => "sandbox_timeout",
            ErrorCode::SandboxEmptyResult => "sandbox_empty_result",
            ErrorCode::PlannerFailed => "planner_failed",
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::Overloaded => "overloaded",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors from the Planner LLM Adapter (§4.2).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider request failed after exhausting retries.
    #[error("llm unavailable: {0}")]
    Unavailable(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from the Action Executor (§4.4), carrying the `ErrorCode` that
/// should be attached to the failing `StepResult`/`ExecutionStep`.
///
/// These are step-level: the orchestrator records them and continues the
/// loop, except where §7 names the code as run-level terminal (only
/// `DiscoveryFailed` among the executor's own codes is terminal; the rest
/// are recoverable step failures).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// See [`ErrorCode::PlannerUsedUnknownTool`].
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// See [`ErrorCode::PlannerUsedUnknownServer`].
    #[error("server mismatch: tool_id={tool_id} server={server}")]
    UnknownServer {
        /// The `tool_id` the command referenced.
        tool_id: String,
        /// The `server` field supplied on the command.
        server: String,
    },

    /// See [`ErrorCode::PlannerUsedUndiscoveredTool`].
    #[error("undiscovered tool: {0}")]
    UndiscoveredTool(String),

    /// See [`ErrorCode::SandboxSyntaxError`].
    #[error("sandbox syntax error: {0}")]
    SandboxSyntaxError(String),

    /// See [`ErrorCode::SandboxInvalidBody`].
    #[error("sandbox invalid body: {0}")]
    SandboxInvalidBody(String),

    /// See [`ErrorCode::SandboxRuntimeError`].
    #[error("sandbox runtime error: {0}")]
    SandboxRuntimeError(String),

    /// See [`ErrorCode::SandboxTimeout`].
    #[error("sandbox timed out")]
    SandboxTimeout,

    /// See [`ErrorCode::SandboxEmptyResult`].
    #[error("sandbox produced an empty result after a tool call")]
    SandboxEmptyResult,

    /// A tool/transport-level error, wrapped as `ActionResponse{successful:false}`
    /// rather than propagated — kept here for callers that want the typed form.
    #[error("transport: {0}")]
    Transport(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ExecutorError {
    /// The `ErrorCode` this executor error maps to, when it is terminal.
    /// Returns `None` for errors that are step-level only.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            ExecutorError::UnknownTool(_) => Some(ErrorCode::PlannerUsedUnknownTool),
            ExecutorError::UnknownServer { .. } => Some(ErrorCode::PlannerUsedUnknownServer),
            ExecutorError::UndiscoveredTool(_) => Some(ErrorCode::PlannerUsedUndiscoveredTool),
            ExecutorError::SandboxSyntaxError(_) => Some(ErrorCode::SandboxSyntaxError),
            ExecutorError::SandboxInvalidBody(_) => Some(ErrorCode::SandboxInvalidBody),
            ExecutorError::SandboxRuntimeError(_) => Some(ErrorCode::SandboxRuntimeError),
            ExecutorError::SandboxTimeout => Some(ErrorCode::SandboxTimeout),
            ExecutorError::SandboxEmptyResult => Some(ErrorCode::SandboxEmptyResult),
            ExecutorError::Transport(_) | ExecutorError::Other(_) => None,
        }
    }
}

/// Errors from the Sandbox Runner (§4.4.3, §6.3, §6.4).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Failed to build the ephemeral sandbox root / generated package.
    #[error("failed to materialize sandbox root: {0}")]
    RootSetup(String),

    /// The subprocess could not be spawned.
    #[error("failed to spawn sandbox subprocess: {0}")]
    Spawn(String),

    /// The subprocess exceeded its wall-clock timeout and was killed.
    #[error("sandbox subprocess timed out")]
    Timeout,

    /// The subprocess exited with stderr output and no sentinel line.
    #[error("sandbox subprocess error: {0}")]
    Runtime(String),

    /// An IPC frame could not be read/written/parsed.
    #[error("sandbox IPC error: {0}")]
    Ipc(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from the Tool Dispatcher / Provider Registry (§6.2).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No provider registered under this id for the tenant.
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    /// The provider exists but is not authorized for this tenant.
    #[error("provider not authorized: {0}")]
    NotAuthorized(String),

    /// A transport-level failure calling the provider.
    #[error("transport: {0}")]
    Transport(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
