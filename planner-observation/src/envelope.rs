//! Observation Envelope assembly (§4.7): redact, trim, and — if the trimmed
//! preview is still too large — move the full value aside.

use crate::redact::redact;
use crate::store::RawOutputStore;
use crate::trim::trim_value;
use planner_core::RawOutputKey;
use serde_json::{json, Value};

/// Oversized previews fall back to storing the full value; this is the byte
/// threshold (of the *trimmed* preview's serialized form) that triggers it.
pub const MAX_PREVIEW_BYTES: usize = 2048;

/// Where an observed value came from, used only to name its `raw_outputs` key.
#[derive(Debug, Clone)]
pub enum ObservationSource {
    /// A tool call's result, identified by `tool_id`.
    Tool(String),
    /// A sandbox run's result, identified by its caller-chosen label.
    Sandbox(String),
}

impl ObservationSource {
    fn raw_output_key(&self, step: u64) -> RawOutputKey {
        match self {
            ObservationSource::Tool(id) => RawOutputKey::new(format!("tool:{id}:{step}")),
            ObservationSource::Sandbox(label) => {
                RawOutputKey::new(format!("sandbox:{label}:{step}"))
            }
        }
    }
}

/// Result of observing one tool/sandbox output.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// The bounded value to place in prompt/history context.
    pub preview: Value,
    /// Key the full (redacted, untrimmed) value was stored under, if the
    /// trimmed preview still exceeded [`MAX_PREVIEW_BYTES`].
    pub raw_output_key: Option<RawOutputKey>,
}

fn summarize(trimmed: &Value) -> Value {
    match trimmed {
        Value::Object(map) => json!({"type": "object", "fields": map.len()}),
        Value::Array(items) => json!({"type": "array", "items": items.len()}),
        Value::String(s) => json!({"type": "string", "chars": s.chars().count()}),
        Value::Number(_) => json!({"type": "number"}),
        Value::Bool(_) => json!({"type": "bool"}),
        Value::Null => json!({"type": "null"}),
    }
}

/// Redact, then trim `value` to a bounded preview. If the trimmed preview
/// still serializes past [`MAX_PREVIEW_BYTES`], the full (redacted) value is
/// stored in `store` and the preview is replaced with a `_stored` pointer.
pub async fn observe(
    source: ObservationSource,
    step: u64,
    value: Value,
    store: &RawOutputStore,
) -> Envelope {
    let redacted = redact(value);
    let trimmed = trim_value(&redacted, 0);

    let size = serde_json::to_string(&trimmed).map(|s| s.len()).unwrap_or(usize::MAX);
    if size <= MAX_PREVIEW_BYTES {
        return Envelope { preview: trimmed, raw_output_key: None };
    }

    let key = source.raw_output_key(step);
    store.put(&key, redacted).await;
    Envelope {
        preview: json!({"_stored": key.as_str(), "summary": summarize(&trimmed)}),
        raw_output_key: Some(key),
    }
}
