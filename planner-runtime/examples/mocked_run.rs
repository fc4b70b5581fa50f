//! End-to-end run against mocked collaborators: no network, no subprocess.
//!
//! Demonstrates wiring a [`Provider`], a [`ToolInvoker`], and a
//! [`SandboxRun`] into a [`PlannerOrchestrator`] without any real backend.
//! Useful as a template for testing planner-driven features.
//!
//! Run with: `cargo run --example mocked_run -p planner-runtime`

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use planner_runtime::prelude::*;
use serde_json::json;

struct ScriptedProvider {
    responses: Mutex<Vec<String>>,
}

impl Provider for ScriptedProvider {
    fn complete(
        &self,
        _request: ProviderRequest,
    ) -> impl Future<Output = Result<ProviderResponse, ProviderError>> + Send {
        let mut responses = self.responses.lock().unwrap();
        let text = if responses.is_empty() {
            json!({"type": "fail", "reasoning": "out of script", "reason": "no more responses"})
                .to_string()
        } else {
            responses.remove(0)
        };
        drop(responses);
        async move {
            Ok(ProviderResponse {
                text,
                stop_reason: planner_llm::StopReason::EndTurn,
                usage: planner_llm::TokenUsage::default(),
                model: "mock".to_string(),
                cost: None,
            })
        }
    }
}

struct EchoInvoker;

#[async_trait]
impl ToolInvoker for EchoInvoker {
    async fn invoke(&self, _tenant: &TenantId, tool_name: &str, args: serde_json::Value) -> ActionResponse {
        let mut data = serde_json::Map::new();
        data.insert("echoed_tool".into(), json!(tool_name));
        data.insert("echoed_args".into(), args);
        ActionResponse::ok(data)
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
        Ok(SandboxResult { success: true, result: Some(json!({})), logs: Vec::new(), error: None, timed_out: false })
    }
}

#[tokio::main]
async fn main() {
    let index = ToolIndex::build(&[ToolSpec {
        provider: "crm".into(),
        name: "lookup_contact".into(),
        params: vec![ParamSpec::required("email", "str")],
        docstring: "Look up a contact by email.".into(),
        output_schema: Some(json!({"name": "string"})),
    }]);

    let tenant = TenantId::new("acme");
    let mut registry = ProviderRegistry::new();
    registry.register(tenant.clone(), "crm", Arc::new(EchoInvoker), true);
    let registry = Arc::new(registry);

    let orchestrator = PlannerOrchestrator::new(
        ScriptedProvider {
            responses: Mutex::new(vec![
                json!({"type": "search", "reasoning": "find a crm tool", "query": "contact"}).to_string(),
                json!({
                    "type": "tool",
                    "reasoning": "look up the contact",
                    "tool_id": "crm.lookup_contact",
                    "server": "crm",
                    "args": {"email": "a@example.com"}
                })
                .to_string(),
                json!({"type": "finish", "reasoning": "done", "summary": "found the contact"}).to_string(),
            ]),
        },
        index,
        registry.clone(),
        Arc::new(ToolDispatcher::new(registry)) as Arc<dyn ToolDispatch>,
        Arc::new(NeverRunSandbox) as Arc<dyn SandboxRun>,
        Arc::new(NullEventSink) as Arc<dyn EventSink>,
        OrchestratorConfig::default(),
    );

    let result = orchestrator
        .execute(RunRequest {
            task: "look up a contact".to_string(),
            tenant: TenantContext::new(tenant),
            budget: Budget::default(),
            extra_context: None,
        })
        .await;

    println!("success: {}", result.success);
    println!("summary: {:?}", result.final_summary);
    println!("steps taken: {}", result.steps.len());
}
