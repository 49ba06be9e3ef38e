//! Tier 1: Concrete scenarios
//!
//! One test per documented scenario, run against an ephemeral fabric.

use crate::test_utils::*;
use memfabric::prelude::*;
use serde_json::json;

#[test]
fn scenario1_set_then_get() {
    let fabric = Fabric::ephemeral().unwrap();
    let kv = fabric.kv();
    let u1 = ScopeHandle::session("u1");

    kv.set(&caller(), &u1, "prefs.theme", "dark").unwrap();
    assert_eq!(kv.get(&caller(), &u1, "prefs.theme").unwrap(), Some(Value::from("dark")));
}

#[test]
fn scenario2_agent_wide_subscription_delivers_once() {
    let fabric = Fabric::ephemeral().unwrap();
    let recorder = Recorder::new();
    let _sub = fabric
        .subscribe_guarded(&caller(), ["prefs.*"], Binding::AgentWide, recorder.handler())
        .unwrap();

    fabric
        .kv()
        .set(&caller(), &ScopeHandle::session("u1"), "prefs.theme", "dark")
        .unwrap();
    settle(&fabric);

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    let wire = serde_json::to_value(events[0].as_ref()).unwrap();
    assert_eq!(wire["scope"], json!("session"));
    assert_eq!(wire["scope_id"], json!("u1"));
    assert_eq!(wire["key"], json!("prefs.theme"));
    assert_eq!(wire["action"], json!("set"));
    assert_eq!(wire["data"], json!("dark"));
    assert_eq!(wire["previous_data"], json!(null));
    assert_eq!(wire["metadata"]["agent_id"], json!("suite"));
    assert_eq!(wire["metadata"]["workflow_id"], json!("wf-suite"));
    assert_eq!(wire["metadata"]["execution_id"], json!("exec-1"));
    assert!(wire["timestamp"].as_str().unwrap().contains('T'));
}

#[test]
fn scenario3_delete_carries_previous_value() {
    let fabric = Fabric::ephemeral().unwrap();
    let kv = fabric.kv();
    let u1 = ScopeHandle::session("u1");

    kv.set(&caller(), &u1, "prefs.theme", "dark").unwrap();
    let event = kv.delete(&caller(), &u1, "prefs.theme").unwrap();

    let wire = serde_json::to_value(event.as_ref()).unwrap();
    assert_eq!(wire["action"], json!("delete"));
    assert_eq!(wire["data"], json!(null));
    assert_eq!(wire["previous_data"], json!("dark"));
    assert_eq!(kv.get(&caller(), &u1, "prefs.theme").unwrap(), None);
}

#[test]
fn scenario4_scope_instance_subscriptions_are_isolated() {
    let fabric = Fabric::ephemeral().unwrap();
    let for_u1 = Recorder::new();
    let for_u2 = Recorder::new();
    let _a = fabric
        .subscribe_guarded(
            &caller(),
            ["prefs.*"],
            Binding::ScopeInstance(ScopeHandle::session("u1")),
            for_u1.handler(),
        )
        .unwrap();
    let _b = fabric
        .subscribe_guarded(
            &caller(),
            ["prefs.*"],
            Binding::ScopeInstance(ScopeHandle::session("u2")),
            for_u2.handler(),
        )
        .unwrap();

    fabric
        .kv()
        .set(&caller(), &ScopeHandle::session("u1"), "prefs.theme", "dark")
        .unwrap();
    settle(&fabric);

    assert_eq!(for_u1.len(), 1);
    assert_eq!(for_u2.len(), 0);
}

#[test]
fn scenario5_similarity_search_top2() {
    let fabric = Fabric::ephemeral().unwrap();
    let vectors = fabric.vectors();
    let scope = ScopeHandle::session("docs");

    // cosine to the query (angle 0) is cos(angle): known and distinct
    let angles = [("far", 1.4f32), ("near", 0.1), ("mid", 0.7), ("nearest", 0.0), ("opposite", 3.0)];
    for (key, angle) in angles {
        let mut meta = VectorMetadata::new();
        meta.insert("angle".into(), json!(angle));
        vectors.set_vector(&caller(), &scope, key, at_angle(angle), meta).unwrap();
    }

    let hits = vectors.similarity_search(&caller(), &scope, &at_angle(0.0), 2).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].key, "nearest");
    assert_eq!(hits[1].key, "near");
    assert!(hits[0].score >= hits[1].score);
    assert!((hits[1].score - 0.1f32.cos()).abs() < 1e-5);
    assert_eq!(hits[1].metadata.get("angle"), Some(&json!(0.1f32)));
}
