#![deny(missing_docs)]
//! # planner-runtime — umbrella crate
//!
//! Single import surface for the planner runtime: a multi-tenant,
//! budget-enforced ReAct agent loop. Re-exports each protocol and
//! implementation crate behind feature flags, plus a `prelude` for the
//! happy path of constructing a [`prelude::PlannerOrchestrator`] and
//! calling [`prelude::PlannerOrchestrator::execute`].

#[cfg(feature = "core")]
pub use planner_core;
#[cfg(feature = "core")]
pub use planner_command;
#[cfg(feature = "core")]
pub use planner_registry;
#[cfg(feature = "core")]
pub use planner_dispatcher;
#[cfg(feature = "core")]
pub use planner_sandbox;
#[cfg(feature = "core")]
pub use planner_tool_index;
#[cfg(feature = "core")]
pub use planner_events;
#[cfg(feature = "core")]
pub use planner_observation;
#[cfg(feature = "core")]
pub use planner_llm;
#[cfg(feature = "core")]
pub use planner_orchestrator;
#[cfg(feature = "anthropic")]
pub use planner_provider_anthropic;

/// Happy-path imports for composing a planner run.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use planner_core::{
        ActionResponse, AgentState, Budget, BudgetAxis, BudgetUsage, CancelSignal, Command,
        DetailLevel, DispatchError, DurationMs, ErrorCode, ExecutionStep, ExecutorError, LlmError,
        McpTaskResult, OverloadPolicy, ProtocolError, RawOutputKey, RunId, SandboxError,
        SandboxResult, StepResult, TenantContext, TenantId, Terminal, ToolDescriptor,
    };

    #[cfg(feature = "core")]
    pub use planner_command::{parse, serialize};

    #[cfg(feature = "core")]
    pub use planner_registry::{ProviderRegistry, ToolInvoker};

    #[cfg(feature = "core")]
    pub use planner_dispatcher::{ToolDispatch, ToolDispatcher};

    #[cfg(feature = "core")]
    pub use planner_sandbox::{SandboxConfig, SandboxRun, SandboxRunner};

    #[cfg(feature = "core")]
    pub use planner_tool_index::{ParamSpec, ToolIndex, ToolSpec};

    #[cfg(feature = "core")]
    pub use planner_events::{ChannelEventSink, Event, EventEnvelope, EventSink, NullEventSink};

    #[cfg(feature = "core")]
    pub use planner_llm::{Provider, ProviderError, ProviderRequest, ProviderResponse};

    #[cfg(feature = "core")]
    pub use planner_orchestrator::{OrchestratorConfig, PlannerOrchestrator, RunRequest};

    #[cfg(feature = "anthropic")]
    pub use planner_provider_anthropic::AnthropicProvider;
}
