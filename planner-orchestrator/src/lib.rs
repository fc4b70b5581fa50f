#![deny(missing_docs)]
//! Orchestrator — §4.1.
//!
//! Drives one run's control loop: prompt the Planner LLM Adapter, parse its
//! response, hand the command to the Action Executor, fold the result into
//! history, and repeat until a budget axis is exhausted, the planner emits
//! `finish`/`fail`, or the run is cancelled. [`PlannerOrchestrator<P>`] stays
//! generic only over [`Provider`] (the one non-object-safe collaborator);
//! every other dependency is held as a trait object so construction doesn't
//! leak generics the caller shouldn't have to name.

mod ast_gate;
mod executor;

pub use executor::{ActionExecutor, ExecutionOutcome};

use std::sync::Arc;
use std::time::Instant;

use planner_core::{
    AgentState, Budget, CancelSignal, Command, DurationMs, ErrorCode, ExecutionStep, LlmError,
    McpTaskResult, RunId, TenantContext, TenantId, Terminal,
};
use planner_dispatcher::ToolDispatch;
use planner_events::{Event, EventEnvelope, EventSink};
use planner_llm::{next_command, PlannerLlmConfig, Provider};
use planner_observation::RawOutputStore;
use planner_registry::ProviderRegistry;
use planner_sandbox::SandboxRun;
use planner_tool_index::ToolIndex;
use serde_json::{json, Value};

/// Tunables for one orchestrator beyond what the Planner LLM Adapter and
/// Action Executor already own.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Config passed through to `planner_llm::next_command`.
    pub llm: PlannerLlmConfig,
    /// Consecutive `ProtocolError`s tolerated before the run ends with
    /// `error_code = "protocol_error"` (§4.1).
    pub max_consecutive_protocol_errors: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            llm: PlannerLlmConfig::default(),
            max_consecutive_protocol_errors: 3,
        }
    }
}

/// One run's inputs, handed to [`PlannerOrchestrator::execute`].
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// The natural-language task.
    pub task: String,
    /// Tenant identity for this run.
    pub tenant: TenantContext,
    /// Resource limits for this run.
    pub budget: Budget,
    /// Caller-supplied context placed into the prompt verbatim.
    pub extra_context: Option<Value>,
}

/// Drives the control loop for one tenant's tool/sandbox universe.
///
/// Built once per tenant (or per request, if the tenant's provider set
/// changes often — §5's "readers observe immutable snapshots" policy means
/// swapping in a fresh `ToolIndex` is just building a new orchestrator).
/// Callers with no telemetry needs can pass `Arc::new(NullEventSink)` for
/// `events`.
pub struct PlannerOrchestrator<P: Provider> {
    provider: P,
    index: ToolIndex,
    registry: Arc<ProviderRegistry>,
    dispatcher: Arc<dyn ToolDispatch>,
    sandbox: Arc<dyn SandboxRun>,
    events: Arc<dyn EventSink>,
    raw_outputs: RawOutputStore,
    config: OrchestratorConfig,
    cancel: CancelSignal,
}

fn build_inventory_view(index: &ToolIndex, registry: &ProviderRegistry, tenant: &TenantId) -> Value {
    let mut by_provider: std::collections::BTreeMap<String, Vec<String>> = Default::default();
    for tool_id in index.tool_ids() {
        let Some((provider, name)) = tool_id.split_once('.') else { continue };
        if registry.is_authorized(tenant, provider) {
            by_provider.entry(provider.to_string()).or_default().push(name.to_string());
        }
    }
    by_provider
        .entry("toolbox".to_string())
        .or_default()
        .push("inspect_tool_output".to_string());
    serde_json::to_value(by_provider).unwrap_or_else(|_| json!({}))
}

fn bounded_preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn tool_id_for_event(command: &Command) -> Option<String> {
    match command {
        Command::Tool { tool_id, .. } => Some(tool_id.clone()),
        Command::Sandbox { label, .. } => Some(label.clone()),
        _ => None,
    }
}

impl<P: Provider> PlannerOrchestrator<P> {
    /// Build an orchestrator over a fixed Tool Index snapshot and its
    /// collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: P,
        index: ToolIndex,
        registry: Arc<ProviderRegistry>,
        dispatcher: Arc<dyn ToolDispatch>,
        sandbox: Arc<dyn SandboxRun>,
        events: Arc<dyn EventSink>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provider,
            index,
            registry,
            dispatcher,
            sandbox,
            events,
            raw_outputs: RawOutputStore::new(),
            config,
            cancel: CancelSignal::never(),
        }
    }

    /// Attach a cooperative cancellation signal, checked at the top of every
    /// loop iteration (§5).
    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    fn emit(&self, run_id: &RunId, step_id: Option<u32>, event: Event) {
        self.events.emit(EventEnvelope {
            run_id: run_id.to_string(),
            step_id,
            timestamp_ms: now_ms(),
            event,
        });
    }

    /// Run the control loop to completion (§4.1).
    ///
    /// Never returns an `Err`: every failure mode (budget exhaustion,
    /// repeated protocol errors, an executor escalation, cancellation, or an
    /// internal LLM failure) is folded into the returned
    /// [`McpTaskResult::error_code`] instead of propagated, so callers
    /// always get back a complete, inspectable record of the run.
    pub async fn execute(&self, request: RunRequest) -> McpTaskResult {
        let run_id = RunId::new(uuid::Uuid::new_v4().to_string());
        let sandbox_token = uuid::Uuid::new_v4().to_string();
        let run_start = Instant::now();

        let inventory_view = build_inventory_view(&self.index, &self.registry, &request.tenant.user_id);
        let task_prefix = bounded_preview(&request.task, 100);
        let budget_json = serde_json::to_value(request.budget).unwrap_or_else(|_| json!({}));
        let user_id = request.tenant.user_id.to_string();

        let mut state = AgentState::new(
            request.task,
            request.tenant,
            request.budget,
            inventory_view,
            request.extra_context,
        );

        self.emit(
            &run_id,
            None,
            Event::TaskStarted { task_prefix, budget: budget_json, user_id },
        );

        let executor = ActionExecutor {
            index: &self.index,
            dispatcher: &self.dispatcher,
            sandbox: &self.sandbox,
            raw_outputs: &self.raw_outputs,
        };

        let mut step_id: u32 = 0;
        let mut terminal_message: Option<String> = None;
        let mut terminal_code: Option<ErrorCode> = None;

        loop {
            if self.cancel.is_cancelled() {
                terminal_message = Some("run was cancelled".to_string());
                terminal_code = Some(ErrorCode::Cancelled);
                break;
            }

            if let Some(axis) = state.usage.exceeded_axis(&state.budget) {
                self.emit(
                    &run_id,
                    None,
                    Event::BudgetExceeded {
                        axis,
                        usage: serde_json::to_value(state.usage).unwrap_or_else(|_| json!({})),
                    },
                );
                terminal_message = Some(format!("budget exhausted on axis: {axis}"));
                terminal_code = Some(ErrorCode::BudgetExhausted);
                break;
            }

            let completion = match next_command(&self.provider, &state, &self.config.llm).await {
                Ok(completion) => completion,
                Err(LlmError::Unavailable(message)) => {
                    terminal_message = Some(message);
                    terminal_code = Some(ErrorCode::LlmUnavailable);
                    break;
                }
                Err(other) => {
                    terminal_message = Some(other.to_string());
                    terminal_code = Some(ErrorCode::InternalError);
                    break;
                }
            };
            state.usage.estimated_llm_cost_usd += completion.estimated_cost_usd;

            let parsed = planner_command::parse(&completion.text);
            let started_at = DurationMs::from(run_start.elapsed());

            let command = match parsed {
                Err(protocol_error) => {
                    let error_message = protocol_error.to_string();
                    let command_json = json!({ "raw_preview": protocol_error.preview });
                    let observation_json = json!({ "error": protocol_error.message });

                    state.consecutive_protocol_errors += 1;
                    state.usage.steps_taken += 1;
                    state.history.push(ExecutionStep {
                        step_id,
                        kind: "protocol_error".to_string(),
                        reasoning: String::new(),
                        command: command_json,
                        observation_preview: observation_json,
                        raw_output_key: None,
                        error: Some(error_message),
                        started_at,
                        ended_at: DurationMs::from(run_start.elapsed()),
                    });
                    step_id += 1;

                    if state.consecutive_protocol_errors >= self.config.max_consecutive_protocol_errors {
                        terminal_message = Some("repeated unparseable planner responses".to_string());
                        terminal_code = Some(ErrorCode::ProtocolError);
                        break;
                    }
                    continue;
                }
                Ok(command) => command,
            };
            state.consecutive_protocol_errors = 0;

            self.emit(
                &run_id,
                Some(step_id),
                Event::PlanningCompleted {
                    decision_type: command.kind().to_string(),
                    tool_id: tool_id_for_event(&command),
                    reasoning_preview: bounded_preview(command.reasoning(), 200),
                },
            );
            self.emit(
                &run_id,
                Some(step_id),
                Event::StepDispatching { step_id, kind: command.kind().to_string() },
            );

            let exec_outcome = executor
                .execute(&command, &mut state, &run_id, &sandbox_token, step_id as u64)
                .await;
            let ended_at = DurationMs::from(run_start.elapsed());
            state.usage.steps_taken += 1;

            self.emit(
                &run_id,
                Some(step_id),
                Event::StepCompleted {
                    step_id,
                    success: exec_outcome.step.success,
                    error: exec_outcome.step.error.clone(),
                },
            );

            state.history.push(ExecutionStep {
                step_id,
                kind: command.kind().to_string(),
                reasoning: command.reasoning().to_string(),
                command: serde_json::to_value(&command).unwrap_or_else(|_| json!({})),
                observation_preview: exec_outcome.step.preview.clone(),
                raw_output_key: exec_outcome.step.raw_output_key.clone(),
                error: exec_outcome.step.error.clone(),
                started_at,
                ended_at,
            });

            if let Some(code) = exec_outcome.terminal_override {
                terminal_message = exec_outcome.step.error.clone();
                terminal_code = Some(code);
                break;
            }

            if command.is_terminal() {
                match command {
                    Command::Finish { summary, .. } => {
                        state.terminal = Some(Terminal::Finish);
                        state.final_summary = Some(summary);
                    }
                    Command::Fail { reason, .. } => {
                        state.terminal = Some(Terminal::Fail);
                        state.final_summary = Some(reason.clone());
                        state.error = Some(reason);
                        terminal_code = Some(ErrorCode::PlannerFailed);
                    }
                    _ => unreachable!("is_terminal only holds for Finish/Fail"),
                }
                break;
            }

            step_id += 1;
        }

        self.raw_outputs.drain_into(&mut state.raw_outputs).await;

        let success = matches!(state.terminal, Some(Terminal::Finish)) && terminal_code.is_none();
        let final_summary = state.final_summary.clone().unwrap_or_else(|| {
            terminal_message
                .clone()
                .unwrap_or_else(|| "run ended without reaching a terminal command".to_string())
        });
        let error = state.error.clone().or(terminal_message);

        self.emit(&run_id, None, Event::TaskCompleted { success, error_code: terminal_code });

        McpTaskResult {
            success,
            final_summary,
            raw_outputs: state.raw_outputs,
            budget_usage: state.usage,
            logs: state.logs,
            steps: state.history,
            error,
            error_code: terminal_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use planner_core::{ActionResponse, SandboxError, SandboxResult};
    use planner_dispatcher::ToolDispatcher;
    use planner_events::NullEventSink;
    use planner_llm::{ProviderError, ProviderRequest, ProviderResponse, StopReason, TokenUsage};
    use planner_registry::ToolInvoker;
    use planner_tool_index::{ParamSpec, ToolSpec};
    use std::collections::BTreeSet;
    use std::future::Future;
    use std::sync::Mutex;

    struct ScriptedProvider {
        responses: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<&str>) -> Self {
            Self { responses: Mutex::new(responses.into_iter().map(String::from).rev().collect()) }
        }
    }

    impl Provider for ScriptedProvider {
        fn complete(
            &self,
            _request: ProviderRequest,
        ) -> impl Future<Output = Result<ProviderResponse, ProviderError>> + Send {
            let text = self.responses.lock().unwrap().pop().unwrap_or_else(|| {
                r#"{"type":"fail","reasoning":"out of script","reason":"exhausted"}"#.to_string()
            });
            async move {
                Ok(ProviderResponse {
                    text,
                    stop_reason: StopReason::EndTurn,
                    usage: TokenUsage { input_tokens: 10, output_tokens: 10 },
                    model: "test-model".to_string(),
                    cost: Some(rust_decimal::Decimal::ZERO),
                })
            }
        }
    }

    struct EchoInvoker;

    #[async_trait]
    impl ToolInvoker for EchoInvoker {
        async fn invoke(&self, _tenant: &TenantId, tool_name: &str, args: Value) -> ActionResponse {
            ActionResponse::ok(serde_json::Map::from_iter([
                ("tool".to_string(), json!(tool_name)),
                ("args".to_string(), args),
            ]))
        }
    }

    struct NeverRunSandbox;

    #[async_trait]
    impl SandboxRun for NeverRunSandbox {
        async fn run(
            &self,
            _run_id: &RunId,
            _token: &str,
            _tenant: &TenantId,
            _code: &str,
            _discovered_tools: &BTreeSet<String>,
            _dispatcher: &dyn ToolDispatch,
        ) -> Result<SandboxResult, SandboxError> {
            Ok(SandboxResult { success: true, result: Some(json!({})), logs: vec![], error: None, timed_out: false })
        }
    }

    fn crm_index() -> ToolIndex {
        ToolIndex::build(&[ToolSpec {
            provider: "crm".to_string(),
            name: "lookup_contact".to_string(),
            params: vec![ParamSpec::required("tenant", "TenantContext"), ParamSpec::required("id", "str")],
            docstring: "Look up a contact by id.".to_string(),
            output_schema: Some(json!({"name": "string"})),
        }])
    }

    fn harness(provider: ScriptedProvider) -> PlannerOrchestrator<ScriptedProvider> {
        let tenant = TenantId::new("acme");
        let mut registry = ProviderRegistry::new();
        registry.register(tenant, "crm", Arc::new(EchoInvoker), true);
        let registry = Arc::new(registry);
        let dispatcher: Arc<dyn ToolDispatch> = Arc::new(ToolDispatcher::new(registry.clone()));
        let sandbox: Arc<dyn SandboxRun> = Arc::new(NeverRunSandbox);

        PlannerOrchestrator::new(
            provider,
            crm_index(),
            registry,
            dispatcher,
            sandbox,
            Arc::new(NullEventSink),
            OrchestratorConfig::default(),
        )
    }

    fn request() -> RunRequest {
        RunRequest {
            task: "look up a contact".to_string(),
            tenant: TenantContext::new("acme"),
            budget: Budget::default(),
            extra_context: None,
        }
    }

    #[tokio::test]
    async fn happy_path_search_then_tool_then_finish() {
        let orchestrator = harness(ScriptedProvider::new(vec![
            r#"{"type":"search","reasoning":"need a tool","query":"lookup contact"}"#,
            r#"{"type":"tool","reasoning":"use it","tool_id":"crm.lookup_contact","server":"crm","args":{"id":"7"}}"#,
            r#"{"type":"finish","reasoning":"done","summary":"found the contact"}"#,
        ]));

        let result = orchestrator.execute(request()).await;
        assert!(result.success);
        assert_eq!(result.final_summary, "found the contact");
        assert_eq!(result.steps.len(), 3);
        assert_eq!(result.budget_usage.tool_calls, 1);
        assert!(result.error_code.is_none());
    }

    #[tokio::test]
    async fn undiscovered_tool_is_a_recoverable_step_failure() {
        let orchestrator = harness(ScriptedProvider::new(vec![
            r#"{"type":"tool","reasoning":"skip discovery","tool_id":"crm.lookup_contact","server":"crm","args":{}}"#,
            r#"{"type":"fail","reasoning":"give up","reason":"could not use the tool"}"#,
        ]));

        let result = orchestrator.execute(request()).await;
        assert!(!result.success);
        assert_eq!(result.error_code, Some(ErrorCode::PlannerFailed));
        assert_eq!(result.steps.len(), 2);
        assert!(result.steps[0].error.is_some());
    }

    #[tokio::test]
    async fn budget_exhaustion_terminates_the_run() {
        let mut req = request();
        req.budget = Budget { max_steps: 1, ..Budget::default() };

        let orchestrator =
            harness(ScriptedProvider::new(vec![r#"{"type":"search","reasoning":"r","query":"anything"}"#]));

        let result = orchestrator.execute(req).await;
        assert!(!result.success);
        assert_eq!(result.error_code, Some(ErrorCode::BudgetExhausted));
    }

    #[tokio::test]
    async fn repeated_protocol_errors_terminate_the_run() {
        let orchestrator = harness(ScriptedProvider::new(vec!["not json", "still not json", "nope"]));

        let result = orchestrator.execute(request()).await;
        assert!(!result.success);
        assert_eq!(result.error_code, Some(ErrorCode::ProtocolError));
    }

    #[tokio::test]
    async fn cancellation_is_observed_at_the_top_of_the_loop() {
        let (tx, rx) = tokio::sync::watch::channel(false);
        tx.send(true).unwrap();
        let orchestrator =
            harness(ScriptedProvider::new(vec![r#"{"type":"search","reasoning":"r","query":"anything"}"#]))
                .with_cancel_signal(CancelSignal::new(rx));

        let result = orchestrator.execute(request()).await;
        assert!(!result.success);
        assert_eq!(result.error_code, Some(ErrorCode::Cancelled));
        assert!(result.steps.is_empty());
    }
}
