//! Tier 2: Properties
//!
//! Invariants that must hold for any input: read-your-write, history
//! chains, pattern semantics, per-key linearizability, search sizing.

use crate::test_utils::*;
use memfabric::prelude::*;
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::thread;

// ============================================================================
// KV
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn get_after_set_returns_value(
        segments in prop::collection::vec("[a-z][a-z0-9_]{0,7}", 1..4),
        value in any::<i64>(),
        session in "[a-z]{1,6}",
    ) {
        let fabric = Fabric::ephemeral().unwrap();
        let kv = fabric.kv();
        let key = segments.join(".");
        let scope = ScopeHandle::session(session);

        kv.set(&caller(), &scope, &key, value).unwrap();
        prop_assert_eq!(kv.get(&caller(), &scope, &key).unwrap(), Some(Value::from(value)));
    }
}

#[test]
fn history_chain_links_every_event() {
    let fabric = Fabric::ephemeral().unwrap();
    let kv = fabric.kv();
    let scope = ScopeHandle::session("chain");
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);

    for _ in 0..200 {
        if rng.gen_bool(0.2) {
            kv.delete(&caller(), &scope, "k").unwrap();
        } else {
            kv.set(&caller(), &scope, "k", rng.gen_range(0..1000i64)).unwrap();
        }
    }

    let events = fabric.events_for(&caller(), &scope, 0, 1000).unwrap();
    assert_eq!(events.len(), 200);
    for pair in events.windows(2) {
        assert_eq!(pair[0].data, pair[1].previous_data);
        assert_eq!(pair[0].sequence + 1, pair[1].sequence);
    }

    // history is the same chain, newest first
    let page = fabric
        .get_history(&caller(), &HistoryFilter::new().scope(scope), 1000)
        .unwrap();
    assert!(page.exhausted);
    let newest_first: Vec<u64> = page.events.iter().map(|e| e.sequence).collect();
    assert_eq!(newest_first, (1..=200u64).rev().collect::<Vec<_>>());
}

// ============================================================================
// Patterns
// ============================================================================

#[test]
fn pattern_wildcards_match_exactly_one_segment() {
    let p = Pattern::parse("a.*.c").unwrap();
    assert!(p.matches("a.b.c"));
    assert!(!p.matches("a.b.b.c"));
    assert!(!p.matches("a.c"));

    let p = Pattern::parse("a.*.*.d").unwrap();
    assert!(p.matches("a.x.y.d"));
    for key in ["a.x.d", "a.x.y.z.d", "b.x.y.d", "a.x.y"] {
        assert!(!p.matches(key), "{} should not match", key);
    }
}

#[test]
fn malformed_patterns_are_rejected_at_subscribe() {
    let fabric = Fabric::ephemeral().unwrap();
    for bad in ["", "a..b", ".a", "a.", "a*", "a.**"] {
        let err = fabric
            .subscribe(&caller(), [bad], Binding::AgentWide, Recorder::new().handler())
            .unwrap_err();
        assert!(matches!(err, FabricError::PatternSyntax { .. }), "{:?}", bad);
    }
    assert_eq!(fabric.dispatcher().subscription_count(), 0);
}

#[test]
fn multi_pattern_subscription_fires_once_per_mutation() {
    let fabric = Fabric::ephemeral().unwrap();
    let recorder = Recorder::new();
    // both patterns match "k1"
    let _sub = fabric
        .subscribe_guarded(
            &caller(),
            ["k1", "k2", "*"],
            Binding::AgentWide,
            recorder.handler(),
        )
        .unwrap();

    let kv = fabric.kv();
    let scope = ScopeHandle::global();
    kv.set(&caller(), &scope, "k1", 1i64).unwrap();
    kv.set(&caller(), &scope, "k2", 2i64).unwrap();
    kv.delete(&caller(), &scope, "k1").unwrap();
    kv.set(&caller(), &scope, "other.key", 3i64).unwrap();
    settle(&fabric);

    let mut keys = recorder.keys();
    keys.sort();
    assert_eq!(keys, vec!["k1", "k1", "k2"]);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn concurrent_sets_are_linearizable_per_key() {
    let fabric = Fabric::ephemeral().unwrap();
    let scope = ScopeHandle::session("race");
    let writers = 16usize;

    let recorder = Recorder::new();
    let _sub = fabric
        .subscribe_guarded(&caller(), ["hot.key"], Binding::AgentWide, recorder.handler())
        .unwrap();

    let barrier = Arc::new(std::sync::Barrier::new(writers));
    let handles: Vec<_> = (0..writers)
        .map(|w| {
            let fabric = Arc::clone(&fabric);
            let scope = scope.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                fabric.kv().set(&caller(), &scope, "hot.key", w as i64).unwrap()
            })
        })
        .collect();
    let returned: Vec<Arc<ChangeEvent>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // M distinct sequences
    let mut sequences: Vec<u64> = returned.iter().map(|e| e.sequence).collect();
    sequences.sort_unstable();
    assert_eq!(sequences, (1..=writers as u64).collect::<Vec<_>>());

    // final value is one input, and it is the last in the chain
    let history = fabric.events_for(&caller(), &scope, 0, 100).unwrap();
    for pair in history.windows(2) {
        assert_eq!(pair[0].data, pair[1].previous_data);
    }
    let final_value = fabric.kv().get(&caller(), &scope, "hot.key").unwrap();
    assert_eq!(final_value, history.last().unwrap().data);
    let inputs: Vec<Value> = (0..writers as i64).map(Value::from).collect();
    assert!(inputs.contains(final_value.as_ref().unwrap()));

    // the subscriber saw the same order
    settle(&fabric);
    let delivered: Vec<u64> = recorder.events().iter().map(|e| e.sequence).collect();
    assert_eq!(delivered, (1..=writers as u64).collect::<Vec<_>>());
}

#[test]
fn unrelated_keys_do_not_serialize() {
    let fabric = Fabric::ephemeral().unwrap();
    let threads = 8;
    let per_thread = 200;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let fabric = Arc::clone(&fabric);
            thread::spawn(move || {
                let kv = fabric.kv();
                let scope = ScopeHandle::session(format!("s{}", t));
                for i in 0..per_thread {
                    kv.set(&caller(), &scope, &format!("k.{}", i), i as i64).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let stats = fabric.stats();
    assert_eq!(stats.keys, threads * per_thread);
    assert_eq!(stats.events, threads * per_thread);
    assert_eq!(stats.partitions, threads);
}

// ============================================================================
// Vectors
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn search_returns_exactly_k_in_score_order(
        vectors in prop::collection::vec(prop::collection::vec(-1.0f32..1.0, 4), 1..40),
        query in prop::collection::vec(-1.0f32..1.0, 4),
        k in 1usize..10,
    ) {
        let fabric = Fabric::ephemeral().unwrap();
        let store = fabric.vectors();
        let scope = ScopeHandle::global();
        for (i, v) in vectors.iter().enumerate() {
            store.set_vector(&caller(), &scope, &format!("v{}", i), v.clone(), VectorMetadata::new()).unwrap();
        }

        let hits = store.similarity_search(&caller(), &scope, &query, k).unwrap();
        prop_assert_eq!(hits.len(), k.min(vectors.len()));
        for pair in hits.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }
}

#[test]
fn search_top_k_zero_is_empty() {
    let fabric = Fabric::ephemeral().unwrap();
    let store = fabric.vectors();
    store
        .set_vector(&caller(), &ScopeHandle::global(), "a", vec![1.0], VectorMetadata::new())
        .unwrap();
    assert!(store
        .similarity_search(&caller(), &ScopeHandle::global(), &[1.0], 0)
        .unwrap()
        .is_empty());
}
