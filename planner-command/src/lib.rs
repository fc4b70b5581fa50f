#![deny(missing_docs)]
//! Command Parser — §4.3.
//!
//! Turns the Planner LLM's raw text output into a typed [`Command`], or a
//! [`ProtocolError`] carrying a bounded preview of the offending text. The
//! schema itself — which fields each command type requires — lives in
//! `planner_core::command`; this crate only does the parsing and the
//! semantic validation serde's shape check can't express (non-empty
//! strings, `limit` range, `tool_id` well-formedness).

use planner_core::{Command, DetailLevel, ProtocolError};

/// Parse one planner response into a [`Command`].
///
/// Accepts a bare JSON object or one wrapped in a markdown code fence
/// (some models insist on ```` ```json ... ``` ````-ing their output even
/// when told not to); anything else is a [`ProtocolError`].
pub fn parse(text: &str) -> Result<Command, ProtocolError> {
    let candidate = strip_code_fence(text.trim());
    if candidate.is_empty() {
        return Err(ProtocolError::new("empty response", text));
    }

    let value: serde_json::Value = serde_json::from_str(candidate)
        .map_err(|e| ProtocolError::new(format!("invalid json: {e}"), text))?;

    if !value.is_object() {
        return Err(ProtocolError::new("expected a JSON object", text));
    }

    let command: Command = serde_json::from_value(value)
        .map_err(|e| ProtocolError::new(format!("does not match command schema: {e}"), text))?;

    validate(&command, text)?;
    Ok(command)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn validate(command: &Command, raw: &str) -> Result<(), ProtocolError> {
    if command.reasoning().trim().is_empty() {
        return Err(ProtocolError::new("reasoning must be non-empty", raw));
    }

    match command {
        Command::Search { query, limit, .. } => {
            if query.trim().is_empty() {
                return Err(ProtocolError::new("search.query must be non-empty", raw));
            }
            if let Some(limit) = limit {
                if !(1..=50).contains(limit) {
                    return Err(ProtocolError::new(
                        format!("search.limit must be in 1..=50, got {limit}"),
                        raw,
                    ));
                }
            }
        }
        Command::Tool {
            tool_id, server, ..
        } => {
            let Some((provider, name)) = tool_id.split_once('.') else {
                return Err(ProtocolError::new(
                    format!("tool.tool_id must be of the form provider.name, got {tool_id:?}"),
                    raw,
                ));
            };
            if provider.is_empty() || name.is_empty() {
                return Err(ProtocolError::new(
                    format!("tool.tool_id must be of the form provider.name, got {tool_id:?}"),
                    raw,
                ));
            }
            if server != provider {
                return Err(ProtocolError::new(
                    format!(
                        "tool.server ({server:?}) must equal tool_id's provider ({provider:?})"
                    ),
                    raw,
                ));
            }
        }
        Command::Sandbox { label, code, .. } => {
            if label.trim().is_empty() {
                return Err(ProtocolError::new("sandbox.label must be non-empty", raw));
            }
            if code.trim().is_empty() {
                return Err(ProtocolError::new("sandbox.code must be non-empty", raw));
            }
        }
        Command::Finish { summary, .. } => {
            if summary.trim().is_empty() {
                return Err(ProtocolError::new("finish.summary must be non-empty", raw));
            }
        }
        Command::Fail { reason, .. } => {
            if reason.trim().is_empty() {
                return Err(ProtocolError::new("fail.reason must be non-empty", raw));
            }
        }
    }
    Ok(())
}

/// Serialize a [`Command`] back to the wire JSON text a planner would emit.
///
/// Used by tests (round-trip property: `parse(serialize(cmd)) == cmd`) and
/// available to callers that persist commands.
pub fn serialize(command: &Command) -> String {
    serde_json::to_string(command).expect("Command serializes infallibly")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_json() {
        let raw = json!({
            "type": "search",
            "reasoning": "need to find an email tool",
            "query": "send email"
        })
        .to_string();
        let cmd = parse(&raw).unwrap();
        assert_eq!(cmd.kind(), "search");
    }

    #[test]
    fn parses_fenced_json() {
        let raw = format!(
            "```json\n{}\n```",
            json!({
                "type": "fail",
                "reasoning": "stuck",
                "reason": "no matching tool after 3 searches"
            })
        );
        let cmd = parse(&raw).unwrap();
        assert!(cmd.is_terminal());
    }

    #[test]
    fn rejects_empty_reasoning() {
        let raw = json!({
            "type": "fail",
            "reasoning": "",
            "reason": "no matching tool"
        })
        .to_string();
        let err = parse(&raw).unwrap_err();
        assert!(err.message.contains("reasoning"));
    }

    #[test]
    fn rejects_search_limit_out_of_range() {
        let raw = json!({
            "type": "search",
            "reasoning": "r",
            "query": "q",
            "limit": 0
        })
        .to_string();
        assert!(parse(&raw).unwrap_err().message.contains("limit"));

        let raw = json!({
            "type": "search",
            "reasoning": "r",
            "query": "q",
            "limit": 51
        })
        .to_string();
        assert!(parse(&raw).unwrap_err().message.contains("limit"));
    }

    #[test]
    fn rejects_tool_id_without_dot() {
        let raw = json!({
            "type": "tool",
            "reasoning": "r",
            "tool_id": "gmailsend",
            "server": "gmail",
            "args": {}
        })
        .to_string();
        assert!(parse(&raw).unwrap_err().message.contains("provider.name"));
    }

    #[test]
    fn rejects_server_mismatch() {
        let raw = json!({
            "type": "tool",
            "reasoning": "r",
            "tool_id": "gmail.send",
            "server": "calendar",
            "args": {}
        })
        .to_string();
        assert!(parse(&raw).unwrap_err().message.contains("must equal"));
    }

    #[test]
    fn rejects_unknown_type() {
        let raw = json!({"type": "delete_everything", "reasoning": "r"}).to_string();
        assert!(parse(&raw).is_err());
    }

    #[test]
    fn rejects_non_json_garbage() {
        let err = parse("the model rambled instead of emitting json").unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn preview_is_bounded_to_200_chars() {
        let raw = "x".repeat(1000);
        let err = parse(&raw).unwrap_err();
        assert_eq!(err.preview.chars().count(), 200);
    }

    #[test]
    fn search_without_detail_level_defaults_to_none() {
        let raw = json!({"type": "search", "reasoning": "r", "query": "q"}).to_string();
        let cmd = parse(&raw).unwrap();
        match cmd {
            Command::Search { detail_level, .. } => assert_eq!(detail_level, None),
            other => panic!("expected search, got {other:?}"),
        }
    }

    proptest::proptest! {
        #[test]
        fn roundtrip_valid_search_commands(
            reasoning in "[a-zA-Z0-9 ]{1,40}",
            query in "[a-zA-Z0-9 ]{1,40}",
            limit in 1u32..=50,
        ) {
            let cmd = Command::Search {
                reasoning,
                query,
                detail_level: Some(DetailLevel::Summary),
                limit: Some(limit),
            };
            let text = serialize(&cmd);
            let parsed = parse(&text).unwrap();
            prop_assert_eq!(parsed, cmd);
        }
    }
}
