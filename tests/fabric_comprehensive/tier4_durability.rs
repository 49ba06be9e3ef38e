//! Tier 4: Durability
//!
//! Everything written through a disk-backed fabric must come back after
//! the fabric is dropped and reopened from the same directory.

use crate::test_utils::*;
use memfabric::fabric_durability::WAL_FILE_NAME;
use memfabric::prelude::*;
use std::io::Write;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn reopen(dir: &TempDir) -> std::sync::Arc<Fabric> {
    Fabric::open(dir.path().join("fabric")).expect("reopen fabric")
}

#[test]
fn client_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fabric");
    let workflow = ScopeHandle::workflow("wf-release");
    {
        let client = FabricClient::open(&path).unwrap().with_caller(caller());
        client.kv_set(&ScopeHandle::session("u1"), "prefs.theme", "dark").unwrap();
        client.kv_set(&ScopeHandle::global(), "config.region", "eu").unwrap();
        assert!(client.register_workflow("wf-release").unwrap());
        client.kv_set(&workflow, "step", 3i64).unwrap();
        client
            .vectors()
            .set(&ScopeHandle::global(), "doc.1", vec![1.0, 0.0], VectorMetadata::new())
            .unwrap();
        client.flush().unwrap();
    }

    let client = FabricClient::open(&path).unwrap().with_caller(caller());
    assert_eq!(
        client.kv_get(&ScopeHandle::session("u1"), "prefs.theme").unwrap(),
        Some(Value::from("dark"))
    );
    assert_eq!(client.kv_get(&workflow, "step").unwrap(), Some(Value::from(3i64)));
    assert!(client.fabric().is_workflow_registered("wf-release"));

    let hits = client
        .vectors()
        .search(&ScopeHandle::global(), vec![0.9, 0.1], 5)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].key, "doc.1");

    let stats = client.stats().unwrap();
    assert_eq!(stats.keys, 3);
    assert_eq!(stats.vectors, 1);
}

#[test]
fn sequences_continue_after_restart() {
    let (dir, fabric) = temp_fabric();
    let scope = ScopeHandle::session("seq");
    for i in 1..=3i64 {
        fabric.kv().set(&caller(), &scope, "k", i).unwrap();
    }
    drop(fabric);

    let fabric = reopen(&dir);
    assert_eq!(fabric.latest_sequence(&caller(), &scope).unwrap(), 3);
    let event = fabric.kv().set(&caller(), &scope, "k", 4i64).unwrap();
    assert_eq!(event.sequence, 4);
    assert_eq!(event.previous_data, Some(Value::from(3i64)));

    let events = fabric.events_for(&caller(), &scope, 0, 100).unwrap();
    assert_eq!(events.len(), 4);
    for pair in events.windows(2) {
        assert_eq!(pair[0].data, pair[1].previous_data);
    }
}

#[test]
fn stored_null_survives_restart() {
    let (dir, fabric) = temp_fabric();
    let scope = ScopeHandle::global();
    fabric.kv().set(&caller(), &scope, "k", Value::null()).unwrap();
    fabric.kv().set(&caller(), &scope, "k", 1i64).unwrap();
    fabric.kv().set(&caller(), &scope, "fresh", Value::null()).unwrap();
    drop(fabric);

    let fabric = reopen(&dir);
    let events = fabric.events_for(&caller(), &scope, 0, 100).unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].data, Some(Value::null()));
    assert_eq!(events[0].previous_data, None);
    assert_eq!(events[1].previous_data, Some(Value::null()));
    assert_eq!(events[0].data, events[1].previous_data);
    assert_eq!(events[2].data, Some(Value::null()));

    assert_eq!(fabric.kv().get(&caller(), &scope, "fresh").unwrap(), Some(Value::null()));
    assert_eq!(fabric.kv().get(&caller(), &scope, "k").unwrap(), Some(Value::from(1i64)));
}

#[test]
fn history_filters_work_on_recovered_events() {
    let (dir, fabric) = temp_fabric();
    let kv = fabric.kv();
    let u1 = ScopeHandle::session("u1");
    kv.set(&caller(), &u1, "cart.item", "book").unwrap();
    kv.delete(&caller(), &u1, "cart.item").unwrap();
    thread::sleep(Duration::from_millis(5));
    let marker = kv.set(&caller(), &ScopeHandle::global(), "cart.total", 0i64).unwrap();
    kv.set(&caller(), &u1, "profile.name", "ada").unwrap();
    drop(kv);
    drop(fabric);

    let fabric = reopen(&dir);

    let deletes = fabric
        .get_history(&caller(), &HistoryFilter::new().action(EventAction::Delete), 10)
        .unwrap();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes.events[0].previous_data, Some(Value::from("book")));

    let carts = fabric
        .get_history(&caller(), &HistoryFilter::new().key_pattern("cart.*"), 10)
        .unwrap();
    assert_eq!(carts.len(), 3);

    let recent = fabric
        .get_history(&caller(), &HistoryFilter::new().since(marker.timestamp), 10)
        .unwrap();
    let keys: Vec<&str> = recent.events.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["profile.name", "cart.total"]);

    let sessions = fabric
        .get_history(&caller(), &HistoryFilter::new().scope_kind(ScopeKind::Session), 10)
        .unwrap();
    assert_eq!(sessions.len(), 3);
    assert!(sessions.exhausted);
}

#[test]
fn torn_tail_does_not_lose_committed_writes() {
    let (dir, fabric) = temp_fabric();
    let scope = ScopeHandle::global();
    for i in 0..20i64 {
        fabric.kv().set(&caller(), &scope, &format!("k.{}", i), i).unwrap();
    }
    drop(fabric);

    {
        let wal = dir.path().join("fabric").join(WAL_FILE_NAME);
        let mut file = std::fs::OpenOptions::new().append(true).open(wal).unwrap();
        file.write_all(&[0x10, 0x00, 0x00, 0x00, 0xff, 0xff]).unwrap();
    }

    let fabric = reopen(&dir);
    assert_eq!(fabric.stats().keys, 20);
    fabric.kv().set(&caller(), &scope, "after.crash", true).unwrap();
    drop(fabric);

    let fabric = reopen(&dir);
    assert_eq!(fabric.stats().keys, 21);
    assert_eq!(
        fabric.kv().get(&caller(), &scope, "after.crash").unwrap(),
        Some(Value::from(true))
    );
}

#[test]
fn read_only_reopen_serves_reads_and_refuses_writes() {
    let (dir, fabric) = temp_fabric();
    fabric
        .kv()
        .set(&caller(), &ScopeHandle::global(), "k", "v")
        .unwrap();
    drop(fabric);

    let fabric = Fabric::open_with_options(
        dir.path().join("fabric"),
        OpenOptions::new().access_mode(AccessMode::ReadOnly),
    )
    .unwrap();
    assert_eq!(
        fabric.kv().get(&caller(), &ScopeHandle::global(), "k").unwrap(),
        Some(Value::from("v"))
    );
    let err = fabric
        .kv()
        .set(&caller(), &ScopeHandle::global(), "k", "w")
        .unwrap_err();
    assert!(matches!(err, FabricError::AccessDenied { .. }));
    assert_eq!(fabric.stats().events, 1);
}
