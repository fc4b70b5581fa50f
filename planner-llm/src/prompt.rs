//! Prompt projection (§4.2, §4.6): turns an `AgentState` into a `ProviderRequest`.

use crate::config::PlannerLlmConfig;
use crate::types::{ProviderMessage, ProviderRequest, Role};
use planner_core::AgentState;

/// System prompt enumerating the command protocol. Fixed rather than
/// templated — the five command types and their constraints don't vary
/// per run.
pub const SYSTEM_PROMPT: &str = r#"You are the planning component of an autonomous agent runtime.
Given the JSON state in the user message, respond with exactly one JSON
command object and nothing else.

Every command has a non-empty "reasoning" string explaining why you chose it.

Command types:
- search: { "type": "search", "reasoning": "...", "query": "...", "detail_level": "summary" | "full" (optional) }
  Discover tools matching a query. You must search before your first "tool"
  or "sandbox" command, and before using any tool id not already present in
  a prior search's results.
- tool: { "type": "tool", "reasoning": "...", "tool_id": "provider.name", "provider": "provider", "args": { ... } }
  Invoke a previously discovered tool. tool_id must be one you have already
  discovered via search, except "toolbox.inspect_tool_output", which is
  always allowed without discovery.
- sandbox: { "type": "sandbox", "reasoning": "...", "label": "...", "code": "..." }
  Run a short Python snippet against already-discovered tools.
- finish: { "type": "finish", "reasoning": "...", "summary": "...", "outputs": { ... } (optional) }
  End the run successfully.
- fail: { "type": "fail", "reasoning": "...", "message": "..." }
  End the run unsuccessfully. Prefer this over guessing: if two or three
  consecutive searches return nothing useful, fail rather than keep
  searching or inventing a tool id.

Never reference a tool id outside what search has already surfaced."#;

/// Render `state`'s prompt projection into a request, prefixed with the
/// fixed system prompt (§4.2's "system prompt requirements").
pub fn render_request(state: &AgentState, config: &PlannerLlmConfig) -> ProviderRequest {
    let prompt_state = state.build_prompt_state();
    let user_text =
        serde_json::to_string(&prompt_state).unwrap_or_else(|_| "{}".to_string());
    ProviderRequest {
        model: Some(config.default_model.clone()),
        messages: vec![
            ProviderMessage { role: Role::System, content: SYSTEM_PROMPT.to_string() },
            ProviderMessage { role: Role::User, content: user_text },
        ],
        max_tokens: Some(config.default_max_tokens),
        temperature: Some(config.default_temperature),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner_core::{Budget, TenantContext};
    use serde_json::json;

    fn state() -> AgentState {
        AgentState::new(
            "do the thing",
            TenantContext::new("tenant-1"),
            Budget::default(),
            json!({}),
            None,
        )
    }

    #[test]
    fn request_carries_system_prompt_first() {
        let req = render_request(&state(), &PlannerLlmConfig::default());
        assert_eq!(req.messages[0].role, Role::System);
        assert!(req.messages[0].content.contains("search"));
        assert!(req.messages[0].content.contains("toolbox.inspect_tool_output"));
    }

    #[test]
    fn user_message_is_the_prompt_projection() {
        let req = render_request(&state(), &PlannerLlmConfig::default());
        assert_eq!(req.messages[1].role, Role::User);
        let projected: serde_json::Value = serde_json::from_str(&req.messages[1].content).unwrap();
        assert_eq!(projected["task"], json!("do the thing"));
    }

    #[test]
    fn request_uses_config_defaults() {
        let config = PlannerLlmConfig { default_max_tokens: 512, ..PlannerLlmConfig::default() };
        let req = render_request(&state(), &config);
        assert_eq!(req.max_tokens, Some(512));
    }
}
