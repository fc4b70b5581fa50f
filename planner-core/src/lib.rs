//! # planner-core — data model for the planner runtime
//!
//! Typed ids, the wire-stable duration type, the budget/usage model, the
//! command schema emitted by the Planner LLM, and the per-run data model
//! (`AgentState`, `ExecutionStep`, `MCPTaskResult`, ...).
//!
//! This crate defines data only — no I/O, no async traits. Behavior lives
//! in the crates that consume these types (`planner-command`,
//! `planner-tool-index`, `planner-orchestrator`, ...).

#![deny(missing_docs)]

pub mod budget;
pub mod cancel;
pub mod command;
pub mod duration;
pub mod error;
pub mod id;
pub mod state;

pub use budget::{Budget, BudgetAxis, BudgetUsage};
pub use cancel::{CancelSignal, OverloadPolicy};
pub use command::{Command, DetailLevel, ProtocolError};
pub use duration::DurationMs;
pub use error::{DispatchError, ErrorCode, ExecutorError, LlmError, SandboxError};
pub use id::{RawOutputKey, RunId, TenantId};
pub use state::{
    ActionResponse, AgentState, ExecutionStep, McpTaskResult, SandboxResult, StepResult, Terminal,
    TenantContext, ToolDescriptor, HISTORY_WINDOW,
};
