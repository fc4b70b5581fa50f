//! Anthropic Messages API request/response types.
//!
//! The planner only ever sends plain-text system/user messages (§4.3 — it
//! speaks JSON commands in free text, not native tool-calling), so unlike a
//! general-purpose client these types carry no tool/image content blocks on
//! the request side.

use serde::{Deserialize, Serialize};

/// Anthropic API request body.
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    /// Model identifier.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Conversation messages (no system role — that goes in `system`).
    pub messages: Vec<AnthropicMessage>,
    /// System prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// A message in the Anthropic API format.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role: `"user"` or `"assistant"`.
    pub role: String,
    /// Plain-text message content.
    pub content: String,
}

/// A content block in an Anthropic API response. Only `Text` is expected —
/// the planner never sends tools, so the model never returns `tool_use` —
/// but `Other` catches anything unrecognized rather than failing to parse.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentBlock {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
    /// Any block type this client doesn't otherwise model.
    #[serde(other)]
    Other,
}

/// Anthropic API response body.
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    /// Response content blocks.
    pub content: Vec<AnthropicContentBlock>,
    /// Model that generated the response.
    pub model: String,
    /// Stop reason.
    pub stop_reason: String,
    /// Token usage.
    pub usage: AnthropicUsage,
}

/// Token usage from the Anthropic API.
#[derive(Debug, Deserialize)]
pub struct AnthropicUsage {
    /// Input tokens used.
    pub input_tokens: u64,
    /// Output tokens generated.
    pub output_tokens: u64,
}
