//! Action Executor (§4.4): executes exactly one parsed [`Command`] against
//! an [`AgentState`], producing a [`StepResult`] the orchestrator folds into
//! history. The only component besides the orchestrator's own budget
//! bookkeeping that mutates `AgentState`.

use std::sync::Arc;

use planner_core::{ActionResponse, AgentState, Command, ErrorCode, ExecutorError, RunId, ToolDescriptor};
use planner_dispatcher::ToolDispatch;
use planner_observation::{observe, ObservationSource, RawOutputStore};
use planner_sandbox::SandboxRun;
use planner_tool_index::{inspect_tool_output, ToolIndex, INSPECT_TOOL_ID};
use serde_json::{json, Value};

use crate::ast_gate;

/// Minimum number of consecutive empty `search`es after which an
/// undiscovered-tool reference is escalated from a recoverable step failure
/// to the terminal `discovery_failed` code (§4.4.1).
const DISCOVERY_FAILED_THRESHOLD: u32 = 3;

/// A step's outcome, plus an optional escalation to a terminal error code
/// the orchestrator should end the run with instead of merely recording the
/// step as failed (§4.4.1's `discovery_failed` rule).
pub struct ExecutionOutcome {
    /// The step result to append to `AgentState.history`.
    pub step: StepOutput,
    /// Set when this step's failure should end the run instead of being
    /// recorded as a recoverable step failure.
    pub terminal_override: Option<ErrorCode>,
}

/// Renamed locally to avoid clashing with `planner_core::StepResult`'s field
/// named `kind` when constructed inline throughout this module.
pub type StepOutput = planner_core::StepResult;

fn step_ok(kind: &str, observation: Value, preview: Value, raw_output_key: Option<planner_core::RawOutputKey>) -> StepOutput {
    StepOutput {
        success: true,
        kind: kind.to_string(),
        observation,
        preview,
        error: None,
        raw_output_key,
    }
}

fn step_err(kind: &str, message: impl Into<String>) -> StepOutput {
    StepOutput {
        success: false,
        kind: kind.to_string(),
        observation: Value::Null,
        preview: Value::Null,
        error: Some(message.into()),
        raw_output_key: None,
    }
}

fn outcome(step: StepOutput) -> ExecutionOutcome {
    ExecutionOutcome { step, terminal_override: None }
}

fn discovery_escalation(error: &ExecutorError, state: &AgentState) -> Option<ErrorCode> {
    let is_discovery_error = matches!(
        error,
        ExecutorError::UndiscoveredTool(_) | ExecutorError::UnknownServer { .. }
    );
    (is_discovery_error && state.consecutive_empty_searches >= DISCOVERY_FAILED_THRESHOLD)
        .then_some(ErrorCode::DiscoveryFailed)
}

/// Executes one command against a run's state and its collaborators.
///
/// Holds only borrowed references — it is reconstructed (cheaply) for every
/// step rather than kept across the run, so it carries no lifetime-tied
/// state of its own.
pub struct ActionExecutor<'a> {
    /// The tenant's Tool Index snapshot.
    pub index: &'a ToolIndex,
    /// Tool Dispatcher used for direct `tool` steps and by the sandbox's
    /// IPC shim.
    pub dispatcher: &'a Arc<dyn ToolDispatch>,
    /// Sandbox Runner used for `sandbox` steps.
    pub sandbox: &'a Arc<dyn SandboxRun>,
    /// Shared store for observations too large to inline.
    pub raw_outputs: &'a RawOutputStore,
}

impl<'a> ActionExecutor<'a> {
    /// Execute `command`, mutating `state` as needed (§4.4).
    pub async fn execute(
        &self,
        command: &Command,
        state: &mut AgentState,
        run_id: &RunId,
        sandbox_token: &str,
        step: u64,
    ) -> ExecutionOutcome {
        match command {
            Command::Search { query, limit, .. } => outcome(self.execute_search(query, *limit, state)),
            Command::Tool { tool_id, server, args, .. } => {
                self.execute_tool(tool_id, server, args.clone(), state, step).await
            }
            Command::Sandbox { label, code, .. } => {
                self.execute_sandbox(label, code, state, run_id, sandbox_token, step).await
            }
            Command::Finish { summary, outputs, .. } => outcome(self.execute_finish(summary, outputs.clone(), state)),
            Command::Fail { reason, .. } => outcome(self.execute_fail(reason)),
        }
    }

    /// §4.4.1.
    fn execute_search(&self, query: &str, limit: Option<u32>, state: &mut AgentState) -> StepOutput {
        let limit = limit.unwrap_or(10) as usize;
        let results: Vec<ToolDescriptor> = self.index.search(query, limit);

        for descriptor in &results {
            state.discovered_tools.insert(descriptor.tool_id.clone());
            match state.search_results.iter_mut().find(|d| d.tool_id == descriptor.tool_id) {
                Some(existing) => *existing = descriptor.clone(),
                None => state.search_results.push(descriptor.clone()),
            }
        }

        state.consecutive_empty_searches =
            if results.is_empty() { state.consecutive_empty_searches + 1 } else { 0 };

        let observation = json!(results);
        step_ok("search", observation.clone(), observation, None)
    }

    fn validate_tool(&self, tool_id: &str, server: &str, state: &AgentState) -> Result<(), ExecutorError> {
        if !state.can_use(tool_id) {
            return Err(ExecutorError::UndiscoveredTool(tool_id.to_string()));
        }
        let provider = tool_id.split('.').next().unwrap_or_default();
        if tool_id != INSPECT_TOOL_ID && self.index.get(tool_id).is_none() {
            return Err(ExecutorError::UnknownTool(tool_id.to_string()));
        }
        if server != provider {
            return Err(ExecutorError::UnknownServer {
                tool_id: tool_id.to_string(),
                server: server.to_string(),
            });
        }
        Ok(())
    }

    /// §4.4.2.
    async fn execute_tool(
        &self,
        tool_id: &str,
        server: &str,
        args: Value,
        state: &mut AgentState,
        step: u64,
    ) -> ExecutionOutcome {
        if let Err(e) = self.validate_tool(tool_id, server, state) {
            let escalation = discovery_escalation(&e, state);
            return ExecutionOutcome { step: step_err("tool", e.to_string()), terminal_override: escalation };
        }

        if tool_id == INSPECT_TOOL_ID {
            return outcome(self.execute_inspect(args, state, step).await);
        }

        let (provider, name) = tool_id.split_once('.').expect("validated dotted tool_id");
        let response: ActionResponse =
            self.dispatcher.invoke(&state.tenant.user_id, provider, name, args).await;
        let successful = response.successful;
        if successful {
            state.usage.tool_calls += 1;
        }

        let envelope = observe(
            ObservationSource::Tool(tool_id.to_string()),
            step,
            json!(response.data),
            self.raw_outputs,
        )
        .await;

        outcome(StepOutput {
            success: successful,
            kind: "tool".to_string(),
            observation: json!(response.data),
            preview: envelope.preview,
            error: response.error,
            raw_output_key: envelope.raw_output_key,
        })
    }

    async fn execute_inspect(&self, args: Value, state: &mut AgentState, step: u64) -> StepOutput {
        let target = args.get("tool_id").and_then(Value::as_str).unwrap_or_default();
        let field_path = args.get("field_path").and_then(Value::as_str).unwrap_or_default();

        match inspect_tool_output(self.index, target, field_path) {
            Ok(value) => {
                state.usage.tool_calls += 1;
                let envelope =
                    observe(ObservationSource::Tool(INSPECT_TOOL_ID.to_string()), step, value.clone(), self.raw_outputs)
                        .await;
                step_ok("tool", value, envelope.preview, envelope.raw_output_key)
            }
            Err(e) => step_err("tool", e.to_string()),
        }
    }

    /// §4.4.3.
    async fn execute_sandbox(
        &self,
        label: &str,
        code: &str,
        state: &mut AgentState,
        run_id: &RunId,
        sandbox_token: &str,
        step: u64,
    ) -> ExecutionOutcome {
        if let Err(e) = ast_gate::check(code, &state.discovered_tools) {
            let escalation = discovery_escalation(&e, state);
            return ExecutionOutcome { step: step_err("sandbox", e.to_string()), terminal_override: escalation };
        }

        let ran = self
            .sandbox
            .run(
                run_id,
                sandbox_token,
                &state.tenant.user_id,
                code,
                &state.discovered_tools,
                self.dispatcher.as_ref(),
            )
            .await;

        let sandbox_result = match ran {
            Ok(r) => r,
            Err(e) => return outcome(step_err("sandbox", e.to_string())),
        };

        state.logs.extend(sandbox_result.logs.iter().cloned());

        if sandbox_result.timed_out {
            return outcome(step_err("sandbox", "sandbox subprocess timed out"));
        }
        if !sandbox_result.success {
            let message = sandbox_result.error.unwrap_or_else(|| "sandbox runtime error".to_string());
            return outcome(step_err("sandbox", message));
        }

        let value = sandbox_result.result.unwrap_or_else(|| json!({}));
        let called_a_tool = code.contains("servers.");
        let is_empty = value.as_object().is_some_and(|m| m.is_empty());
        if is_empty && called_a_tool {
            return outcome(step_err("sandbox", "sandbox produced an empty result after a tool call"));
        }

        state.usage.code_runs += 1;
        let envelope =
            observe(ObservationSource::Sandbox(label.to_string()), step, value.clone(), self.raw_outputs).await;
        outcome(step_ok("sandbox", value, envelope.preview, envelope.raw_output_key))
    }

    /// §4.4.4.
    fn execute_finish(&self, summary: &str, outputs: Option<Value>, state: &mut AgentState) -> StepOutput {
        if let Some(outputs) = outputs {
            state.merge_finish_outputs(outputs);
        }
        step_ok("finish", json!({"summary": summary}), json!({"summary": summary}), None)
    }

    /// §4.4.4.
    fn execute_fail(&self, reason: &str) -> StepOutput {
        step_err("fail", reason)
    }
}
