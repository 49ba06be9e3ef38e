//! Tier 3: Dispatch and isolation
//!
//! Subscription bindings, handler containment, unsubscribe, per-key
//! ordering and actor privacy.

use crate::test_utils::*;
use memfabric::prelude::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn scope_instance_binding_ignores_other_scopes() {
    let fabric = Fabric::ephemeral().unwrap();
    let recorder = Recorder::new();
    let u1 = fabric.session(caller(), "u1");
    let _sub = u1.on_change(["*"], recorder.handler()).unwrap();

    let kv = fabric.kv();
    kv.set(&caller(), &ScopeHandle::session("u2"), "k", 1i64).unwrap();
    kv.set(&caller(), &ScopeHandle::global(), "k", 2i64).unwrap();
    u1.set("k", 3i64).unwrap();
    settle(&fabric);

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].scope_id.as_deref(), Some("u1"));
    assert_eq!(events[0].data, Some(Value::from(3i64)));
}

#[test]
fn failing_and_panicking_handlers_are_contained() {
    let fabric = Fabric::ephemeral().unwrap();
    let healthy = Recorder::new();

    let _failing = fabric
        .subscribe_guarded(
            &caller(),
            ["k"],
            Binding::AgentWide,
            handler_fn(|_event: Arc<ChangeEvent>| async move {
                Err::<(), _>(anyhow::anyhow!("handler refused"))
            }),
        )
        .unwrap();
    let _panicking = fabric
        .subscribe_guarded(
            &caller(),
            ["k"],
            Binding::AgentWide,
            handler_fn(|_event: Arc<ChangeEvent>| async move {
                if true {
                    panic!("handler blew up");
                }
                anyhow::Ok(())
            }),
        )
        .unwrap();
    let _healthy = fabric
        .subscribe_guarded(&caller(), ["k"], Binding::AgentWide, healthy.handler())
        .unwrap();

    let kv = fabric.kv();
    for i in 0..5i64 {
        kv.set(&caller(), &ScopeHandle::global(), "k", i).unwrap();
    }
    settle(&fabric);

    assert_eq!(healthy.len(), 5);
    let stats = fabric.stats().dispatch;
    assert_eq!(stats.failed, 10);
    assert_eq!(stats.delivered, 5);
    assert_eq!(
        kv.get(&caller(), &ScopeHandle::global(), "k").unwrap(),
        Some(Value::from(4i64))
    );
}

#[test]
fn unsubscribe_stops_delivery() {
    let fabric = Fabric::ephemeral().unwrap();
    let kv = fabric.kv();
    let scope = ScopeHandle::global();

    let by_id = Recorder::new();
    let id = fabric
        .subscribe(&caller(), ["k"], Binding::AgentWide, by_id.handler())
        .unwrap();
    let by_guard = Recorder::new();
    let guard = fabric
        .subscribe_guarded(&caller(), ["k"], Binding::AgentWide, by_guard.handler())
        .unwrap();

    kv.set(&caller(), &scope, "k", 1i64).unwrap();
    settle(&fabric);

    assert!(fabric.unsubscribe(id));
    assert!(!fabric.unsubscribe(id));
    drop(guard);
    assert_eq!(fabric.dispatcher().subscription_count(), 0);

    kv.set(&caller(), &scope, "k", 2i64).unwrap();
    settle(&fabric);

    assert_eq!(by_id.len(), 1);
    assert_eq!(by_guard.len(), 1);
}

#[test]
fn unsubscribe_keeps_already_queued_deliveries() {
    let fabric = Fabric::ephemeral().unwrap();
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let (wait, sink) = (Arc::clone(&gate), Arc::clone(&seen));
    let id = fabric
        .subscribe(
            &caller(),
            ["k"],
            Binding::AgentWide,
            handler_fn(move |event: Arc<ChangeEvent>| {
                let wait = Arc::clone(&wait);
                let sink = Arc::clone(&sink);
                async move {
                    let _permit = wait.acquire().await?;
                    sink.lock().push(event.sequence);
                    anyhow::Ok(())
                }
            }),
        )
        .unwrap();

    let kv = fabric.kv();
    for i in 1..=3i64 {
        kv.set(&caller(), &ScopeHandle::global(), "k", i).unwrap();
    }
    assert!(fabric.unsubscribe(id));
    kv.set(&caller(), &ScopeHandle::global(), "k", 4i64).unwrap();

    gate.add_permits(16);
    settle(&fabric);

    assert_eq!(*seen.lock(), vec![1, 2, 3]);
    let stats = fabric.stats().dispatch;
    assert_eq!(stats.enqueued, 3);
    assert_eq!(stats.delivered, 3);
}

#[test]
fn deliveries_for_one_key_keep_sequence_order() {
    let fabric = Fabric::ephemeral().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let overlapped = Arc::new(AtomicUsize::new(0));

    let (sink, flight, overlap) = (
        Arc::clone(&seen),
        Arc::clone(&in_flight),
        Arc::clone(&overlapped),
    );
    let _sub = fabric
        .subscribe_guarded(
            &caller(),
            ["counter"],
            Binding::AgentWide,
            handler_fn(move |event: Arc<ChangeEvent>| {
                let sink = Arc::clone(&sink);
                let flight = Arc::clone(&flight);
                let overlap = Arc::clone(&overlap);
                async move {
                    if flight.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlap.fetch_add(1, Ordering::SeqCst);
                    }
                    tokio::task::yield_now().await;
                    sink.lock().push(event.sequence);
                    flight.fetch_sub(1, Ordering::SeqCst);
                    anyhow::Ok(())
                }
            }),
        )
        .unwrap();

    let kv = fabric.kv();
    for i in 0..100i64 {
        kv.set(&caller(), &ScopeHandle::global(), "counter", i).unwrap();
    }
    settle(&fabric);

    assert_eq!(*seen.lock(), (1..=100u64).collect::<Vec<_>>());
    assert_eq!(overlapped.load(Ordering::SeqCst), 0);
}

#[test]
fn actor_scope_is_private() {
    let fabric = Fabric::ephemeral().unwrap();
    let alice = CallerContext::agent("a1").with_actor("alice");
    let bob = CallerContext::agent("a2").with_actor("bob");
    let scope = ScopeHandle::actor("alice");

    fabric.kv().set(&alice, &scope, "notes.todo", "ship").unwrap();

    let err = fabric.kv().get(&bob, &scope, "notes.todo").unwrap_err();
    assert!(matches!(err, FabricError::AccessDenied { .. }));
    let err = fabric.kv().set(&bob, &scope, "notes.todo", "x").unwrap_err();
    assert!(matches!(err, FabricError::AccessDenied { .. }));

    let err = fabric
        .subscribe(
            &bob,
            ["*"],
            Binding::ScopeInstance(scope.clone()),
            Recorder::new().handler(),
        )
        .unwrap_err();
    assert!(matches!(err, FabricError::AccessDenied { .. }));

    // history hides other actors' scopes instead of failing
    let page = fabric.get_history(&bob, &HistoryFilter::new(), 10).unwrap();
    assert!(page.is_empty());
    let page = fabric.get_history(&alice, &HistoryFilter::new(), 10).unwrap();
    assert_eq!(page.len(), 1);

    // the owner's own scoped view sees the data
    let mine = fabric.actor(alice).unwrap();
    assert_eq!(mine.get("notes.todo").unwrap(), Some(Value::from("ship")));
    assert!(fabric.actor(CallerContext::agent("no-actor")).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dispatch_runs_on_the_ambient_runtime() {
    let fabric = Fabric::ephemeral().unwrap();
    assert!(!fabric.dispatcher().owns_runtime());

    let recorder = Recorder::new();
    let _sub = fabric
        .subscribe_guarded(&caller(), ["task.*"], Binding::AgentWide, recorder.handler())
        .unwrap();

    let scoped = fabric.workflow(caller(), "wf-suite");
    fabric.register_workflow("wf-suite");
    scoped.set("task.status", "running").unwrap();
    scoped.set("task.status", "done").unwrap();
    fabric.quiesce().await;

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].previous_data, Some(Value::from("running")));
    fabric.shutdown().await.unwrap();
}
