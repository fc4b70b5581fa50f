//! Truncation, clipping, and depth-folding thresholds (§4.7).

use serde_json::{json, Value};

/// Strings longer than this are truncated with a `…[N chars]` suffix.
pub const MAX_STRING_CHARS: usize = 500;
/// Arrays longer than this are clipped with a `…+M more` sentinel.
pub const MAX_ARRAY_ITEMS: usize = 20;
/// Containers nested deeper than this are folded to a type marker.
pub const MAX_OBJECT_DEPTH: usize = 3;

fn truncate_string(s: &str) -> Value {
    let total = s.chars().count();
    if total <= MAX_STRING_CHARS {
        return json!(s);
    }
    let head: String = s.chars().take(MAX_STRING_CHARS).collect();
    json!(format!("{head}…[{total} chars]"))
}

fn fold_marker(value: &Value) -> Value {
    match value {
        Value::Object(map) => json!(format!("<object: {} fields>", map.len())),
        Value::Array(items) => json!(format!("<array: {} items>", items.len())),
        other => other.clone(),
    }
}

/// Apply the truncation/clipping/depth-folding rules to `value`, returning a
/// bounded preview. `depth` is the nesting level of `value` itself (the
/// envelope's top-level call always starts at `0`).
pub fn trim_value(value: &Value, depth: usize) -> Value {
    match value {
        Value::String(s) => truncate_string(s),
        Value::Array(items) => {
            if depth >= MAX_OBJECT_DEPTH {
                return fold_marker(value);
            }
            let mut out: Vec<Value> = items
                .iter()
                .take(MAX_ARRAY_ITEMS)
                .map(|v| trim_value(v, depth + 1))
                .collect();
            if items.len() > MAX_ARRAY_ITEMS {
                out.push(json!(format!("…+{} more", items.len() - MAX_ARRAY_ITEMS)));
            }
            Value::Array(out)
        }
        Value::Object(map) => {
            if depth >= MAX_OBJECT_DEPTH {
                return fold_marker(value);
            }
            Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), trim_value(v, depth + 1)))
                    .collect(),
            )
        }
        other => other.clone(),
    }
}
