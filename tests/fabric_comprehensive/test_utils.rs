//! Shared helpers for the comprehensive suite.

use memfabric::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Default caller for tests.
pub fn caller() -> CallerContext {
    CallerContext::agent("suite")
        .with_workflow("wf-suite")
        .with_execution("exec-1")
}

/// Route `tracing` output to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Disk-backed fabric in a fresh temporary directory.
pub fn temp_fabric() -> (TempDir, Arc<Fabric>) {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let fabric = Fabric::open(dir.path().join("fabric")).expect("open fabric");
    (dir, fabric)
}

/// Wait for every queued delivery to run.
pub fn settle(fabric: &Fabric) {
    assert!(
        fabric.quiesce_blocking(Duration::from_secs(10)),
        "dispatcher did not drain"
    );
}

/// Collects delivered events.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Arc<ChangeEvent>>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler that appends every event to this recorder.
    pub fn handler(&self) -> impl EventHandler {
        let events = Arc::clone(&self.events);
        handler_fn(move |event: Arc<ChangeEvent>| {
            let events = Arc::clone(&events);
            async move {
                events.lock().push(event);
                anyhow::Ok(())
            }
        })
    }

    pub fn events(&self) -> Vec<Arc<ChangeEvent>> {
        self.events.lock().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}

/// Unit vector at `angle` radians in the plane.
pub fn at_angle(angle: f32) -> Vec<f32> {
    vec![angle.cos(), angle.sin()]
}
