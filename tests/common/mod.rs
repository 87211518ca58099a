//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use rtc_bridge::{ContextOptions, LoopbackEngine, Session};

/// Route `tracing` output to the test harness. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A loopback engine and a software session on it.
pub fn session() -> (Arc<LoopbackEngine>, Session) {
    init_tracing();
    let engine = Arc::new(LoopbackEngine::new());
    let session = Session::create(engine.clone(), &ContextOptions::software(1))
        .expect("session creation should succeed");
    (engine, session)
}
