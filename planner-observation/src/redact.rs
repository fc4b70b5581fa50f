//! Redaction pass (§4.7), run before anything is trimmed, previewed, or stored.

use serde_json::Value;

const REDACTED_KEYS: &[&str] = &[
    "token",
    "authorization",
    "password",
    "api_key",
    "secret",
    "refresh_token",
    "access_token",
];

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    REDACTED_KEYS.iter().any(|k| *k == key)
}

/// Replace the value of every object key matching the sensitive-key set
/// (case-insensitive) with `"<redacted>"`, recursing through nested objects
/// and arrays. Matching is on key name alone, regardless of depth or what
/// the value actually contains.
pub fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    if is_sensitive_key(&k) {
                        (k, Value::String("<redacted>".to_string()))
                    } else {
                        (k, redact(v))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_known_keys_case_insensitively() {
        let v = json!({"Api_Key": "sk-123", "note": "fine"});
        let r = redact(v);
        assert_eq!(r["Api_Key"], json!("<redacted>"));
        assert_eq!(r["note"], json!("fine"));
    }

    #[test]
    fn redacts_nested_and_array_values() {
        let v = json!({
            "user": {"password": "hunter2", "name": "alice"},
            "sessions": [{"access_token": "abc"}, {"access_token": "def"}]
        });
        let r = redact(v);
        assert_eq!(r["user"]["password"], json!("<redacted>"));
        assert_eq!(r["user"]["name"], json!("alice"));
        assert_eq!(r["sessions"][0]["access_token"], json!("<redacted>"));
        assert_eq!(r["sessions"][1]["access_token"], json!("<redacted>"));
    }

    #[test]
    fn leaves_unrelated_keys_untouched() {
        let v = json!({"id": "1", "url": "https://example.com"});
        assert_eq!(redact(v.clone()), v);
    }
}
