//! Shared sink for values moved out of the inline observation preview (§4.7).

use planner_core::RawOutputKey;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Where an oversized observation's full value is held until the
/// orchestrator drains it into `AgentState.raw_outputs` at the end of a
/// step. Kept behind a lock rather than owned by `AgentState` directly so
/// tool dispatch and sandbox execution can write into it without holding a
/// mutable borrow of the run's state across an await point.
#[derive(Default)]
pub struct RawOutputStore {
    data: RwLock<HashMap<String, Value>>,
}

impl RawOutputStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`, overwriting any prior value.
    pub async fn put(&self, key: &RawOutputKey, value: Value) {
        self.data.write().await.insert(key.as_str().to_string(), value);
    }

    /// Fetch a previously stored value, if any.
    pub async fn get(&self, key: &RawOutputKey) -> Option<Value> {
        self.data.read().await.get(key.as_str()).cloned()
    }

    /// Move every entry into `target`, leaving the store empty. Existing
    /// keys in `target` are overwritten, mirroring `put`'s overwrite
    /// semantics rather than `AgentState::merge_finish_outputs`'s
    /// keep-existing rule (these keys are always freshly generated and
    /// never collide with caller-supplied `finish` outputs in practice).
    pub async fn drain_into(&self, target: &mut HashMap<String, Value>) {
        let mut data = self.data.write().await;
        target.extend(data.drain());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = RawOutputStore::new();
        let key = RawOutputKey::new("tool:gmail.gmail_search:1");
        store.put(&key, json!({"a": 1})).await;
        assert_eq!(store.get(&key).await, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let store = RawOutputStore::new();
        let key = RawOutputKey::new("tool:x:1");
        assert_eq!(store.get(&key).await, None);
    }

    #[tokio::test]
    async fn drain_into_moves_all_entries_and_empties_store() {
        let store = RawOutputStore::new();
        let k1 = RawOutputKey::new("tool:a:1");
        let k2 = RawOutputKey::new("sandbox:b:2");
        store.put(&k1, json!(1)).await;
        store.put(&k2, json!(2)).await;

        let mut target = HashMap::new();
        store.drain_into(&mut target).await;

        assert_eq!(target.get("tool:a:1"), Some(&json!(1)));
        assert_eq!(target.get("sandbox:b:2"), Some(&json!(2)));
        assert_eq!(store.get(&k1).await, None);
    }
}
