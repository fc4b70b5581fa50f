#![deny(missing_docs)]
//! Anthropic Messages API backend for `planner-llm`.
//!
//! Implements [`planner_llm::Provider`] for Anthropic's Messages API.

mod types;

use planner_llm::{Provider, ProviderError, ProviderRequest, ProviderResponse, Role, StopReason, TokenUsage};
use types::*;

/// Anthropic API provider.
pub struct AnthropicProvider {
    api_key: String,
    client: reqwest::Client,
    api_url: String,
    api_version: String,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            api_url: "https://api.anthropic.com/v1/messages".into(),
            api_version: "2023-06-01".into(),
        }
    }

    /// Override the API URL (for testing or proxies).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    fn build_request(&self, request: &ProviderRequest) -> (AnthropicRequest, Option<String>) {
        let model = request.model.clone().unwrap_or_else(|| "claude-haiku-4-5-20251001".into());
        let max_tokens = request.max_tokens.unwrap_or(4096);

        // The system message (if any) goes in Anthropic's dedicated `system`
        // field rather than the message list.
        let mut system = None;
        let mut messages = Vec::with_capacity(request.messages.len());
        for m in &request.messages {
            match m.role {
                Role::System => system = Some(m.content.clone()),
                Role::User => messages.push(AnthropicMessage { role: "user".into(), content: m.content.clone() }),
                Role::Assistant => {
                    messages.push(AnthropicMessage { role: "assistant".into(), content: m.content.clone() })
                }
            }
        }

        (
            AnthropicRequest { model, max_tokens, messages, system: system.clone(), temperature: request.temperature },
            system,
        )
    }

    fn parse_response(&self, response: AnthropicResponse) -> ProviderResponse {
        let text = response
            .content
            .iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text.as_str()),
                AnthropicContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        let stop_reason = match response.stop_reason.as_str() {
            "max_tokens" => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        let usage = TokenUsage { input_tokens: response.usage.input_tokens, output_tokens: response.usage.output_tokens };

        // Anthropic's response doesn't echo pricing, and a single hardcoded
        // rate here would be wrong for every model but one. Leave `cost` for
        // `planner_llm::next_command`'s model-aware rate table to fill in.
        ProviderResponse { text, stop_reason, usage, model: response.model, cost: None }
    }
}

impl Provider for AnthropicProvider {
    fn complete(
        &self,
        request: ProviderRequest,
    ) -> impl std::future::Future<Output = Result<ProviderResponse, ProviderError>> + Send {
        let (api_request, _system) = self.build_request(&request);
        let http_request = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
            .json(&api_request);

        async move {
            let http_response =
                http_request.send().await.map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

            let status = http_response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(ProviderError::RateLimited);
            }
            if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
                let body = http_response.text().await.unwrap_or_default();
                return Err(ProviderError::AuthFailed(body));
            }
            if !status.is_success() {
                let body = http_response.text().await.unwrap_or_default();
                return Err(ProviderError::RequestFailed(format!("HTTP {status}: {body}")));
            }

            let api_response: AnthropicResponse =
                http_response.json().await.map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

            Ok(self.parse_response(api_response))
        }
    }
}
