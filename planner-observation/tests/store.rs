use planner_observation::{observe, ObservationSource, RawOutputStore};
use serde_json::json;
use std::collections::HashMap;

#[tokio::test]
async fn drained_raw_outputs_are_addressable_by_their_envelope_key() {
    let store = RawOutputStore::new();
    let big = json!({
        "rows": (0..500).map(|i| json!({"id": i, "note": "x".repeat(20)})).collect::<Vec<_>>()
    });

    let env = observe(ObservationSource::Tool("svc.list_rows".into()), 4, big.clone(), &store)
        .await;
    let key = env.raw_output_key.clone().expect("large payload should be stored");

    let mut raw_outputs: HashMap<String, serde_json::Value> = HashMap::new();
    store.drain_into(&mut raw_outputs).await;

    assert_eq!(raw_outputs.get(key.as_str()), Some(&big));
    assert_eq!(env.preview["_stored"], serde_json::json!(key.as_str()));
}

#[tokio::test]
async fn small_payloads_never_touch_the_store() {
    let store = RawOutputStore::new();
    let env = observe(
        ObservationSource::Sandbox("main".into()),
        1,
        json!({"ok": true}),
        &store,
    )
    .await;
    assert!(env.raw_output_key.is_none());

    let mut raw_outputs = HashMap::new();
    store.drain_into(&mut raw_outputs).await;
    assert!(raw_outputs.is_empty());
}

#[tokio::test]
async fn concurrent_observations_land_under_distinct_keys() {
    use std::sync::Arc;

    let store = Arc::new(RawOutputStore::new());
    let big = |n: usize| {
        json!({"rows": (0..500).map(|i| json!({"id": i, "n": n})).collect::<Vec<_>>()})
    };

    let mut handles = Vec::new();
    for step in 0..5u64 {
        let store = Arc::clone(&store);
        let value = big(step as usize);
        handles.push(tokio::spawn(async move {
            observe(ObservationSource::Tool("svc.batch".into()), step, value, &store).await
        }));
    }

    let mut keys = Vec::new();
    for h in handles {
        let env = h.await.unwrap();
        keys.push(env.raw_output_key.expect("large payload should be stored"));
    }

    let mut raw_outputs = HashMap::new();
    store.drain_into(&mut raw_outputs).await;
    for key in &keys {
        assert!(raw_outputs.contains_key(key.as_str()));
    }
    assert_eq!(raw_outputs.len(), 5);
}
