//! Session lifetime tests.
//!
//! These drive the loopback engine, whose journal records every native
//! call in order.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use rtc_bridge::{
    Allocation, Call, ContextOptions, EncoderType, Engine, LoopbackEngine, ResourceKind, Session,
    SessionId, SessionState,
};

#[test]
fn test_sweep_disposes_leftovers_without_double_release() {
    let (engine, session) = common::session();

    let a = session.create_media_stream("a").unwrap();
    let b = session.create_media_stream("b").unwrap();
    let a_handle = a.native_handle();
    let b_handle = b.native_handle();

    a.dispose();
    assert!(a.is_disposed());
    assert_eq!(session.live_resources(), 1);

    session.dispose();

    assert!(b.is_disposed(), "sweep should dispose b");
    assert_eq!(engine.release_count(a_handle), 1, "a released exactly once");
    assert_eq!(engine.release_count(b_handle), 1, "b released by the sweep");
    assert!(engine.violations().is_empty(), "{:?}", engine.violations());
}

#[test]
fn test_context_destroyed_after_every_release() {
    let (engine, session) = common::session();

    let peer = session.create_peer_connection(None).unwrap();
    let _channel = peer.create_data_channel("chat", None).unwrap();
    let source = session.create_audio_track_source().unwrap();
    let _track = session.create_audio_track("mic", &source).unwrap();
    let _renderer = session.create_video_renderer().unwrap();

    session.dispose();

    let journal = engine.journal();
    let destroy_at = journal
        .iter()
        .position(|c| *c == Call::DestroyContext(SessionId(1)))
        .expect("context should be destroyed");
    let releases: Vec<usize> = journal
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Call::Release(..)))
        .map(|(i, _)| i)
        .collect();

    assert_eq!(releases.len(), 5);
    assert!(releases.iter().all(|&i| i < destroy_at));
    assert!(engine.live_objects().is_empty());
    assert!(engine.violations().is_empty(), "{:?}", engine.violations());
}

#[test]
fn test_sweep_releases_dependents_first() {
    let (engine, session) = common::session();

    let peer = session.create_peer_connection(None).unwrap();
    let channel = peer.create_data_channel("chat", None).unwrap();
    let stats = peer.stats_report().unwrap();

    session.dispose();

    let order: Vec<ResourceKind> = engine
        .journal()
        .into_iter()
        .filter_map(|c| match c {
            Call::Release(kind, _) => Some(kind),
            _ => None,
        })
        .collect();
    assert_eq!(
        order,
        vec![
            ResourceKind::StatsReport,
            ResourceKind::DataChannel,
            ResourceKind::PeerConnection
        ]
    );
    assert!(channel.is_disposed() && stats.is_disposed() && peer.is_disposed());
}

#[test]
fn test_dispose_is_idempotent() {
    let (engine, session) = common::session();
    let stream = session.create_media_stream("s").unwrap();

    stream.dispose();
    stream.dispose();
    session.dispose();
    session.dispose();
    stream.dispose();

    let destroys = engine
        .journal()
        .iter()
        .filter(|c| matches!(c, Call::DestroyContext(_)))
        .count();
    assert_eq!(destroys, 1);
    assert_eq!(engine.live_contexts(), 0);
    assert!(engine.violations().is_empty());
    assert_eq!(session.state(), SessionState::Disposed);
}

#[test]
fn test_unsupported_capability_creates_nothing() {
    common::init_tracing();
    let engine = Arc::new(LoopbackEngine::new().without_hardware_encoder());

    let opts = ContextOptions {
        encoder_type: EncoderType::Hardware,
        ..ContextOptions::default()
    };
    let err = Session::create(engine.clone(), &opts).unwrap_err();

    assert!(err.is_unsupported_capability());
    assert!(engine.journal().is_empty(), "no native call should be made");
    assert_eq!(engine.live_contexts(), 0);
}

#[test]
fn test_software_session_without_hardware_encoder() {
    common::init_tracing();
    let engine = Arc::new(LoopbackEngine::new().without_hardware_encoder());
    let session = Session::create(engine, &ContextOptions::software(2)).unwrap();
    assert_eq!(session.encoder_type().unwrap(), EncoderType::Software);
    assert_eq!(session.state(), SessionState::Active);
}

#[test]
fn test_operation_after_session_dispose_is_invalid_state() {
    let (engine, session) = common::session();
    let peer = session.create_peer_connection(None).unwrap();
    let channel = peer.create_data_channel("chat", None).unwrap();

    session.dispose();

    assert!(peer.close().unwrap_err().is_invalid_state());
    assert!(channel.send(b"late").unwrap_err().is_invalid_state());
    assert!(peer.create_data_channel("late", None).unwrap_err().is_invalid_state());
    assert!(!peer.native_handle().is_valid());
    assert!(engine.violations().is_empty());
}

#[test]
fn test_create_after_dispose_is_invalid_state() {
    let (engine, session) = common::session();
    session.dispose();

    let err = session.create_media_stream("late").unwrap_err();
    assert!(err.is_invalid_state());
    assert!(session.encoder_type().unwrap_err().is_invalid_state());
    assert!(!session.context_handle().is_valid());
    assert!(engine
        .journal()
        .iter()
        .all(|c| !matches!(c, Call::Allocate(..))));
}

#[test]
fn test_dropped_wrapper_is_released_immediately() {
    let (engine, session) = common::session();
    let stream = session.create_media_stream("s").unwrap();
    let handle = stream.native_handle();

    drop(stream);

    assert_eq!(engine.release_count(handle), 1);
    assert_eq!(session.live_resources(), 0);
    assert!(session.resolve(handle).is_none());

    session.dispose();
    assert_eq!(engine.release_count(handle), 1);
    assert!(engine.violations().is_empty());
}

#[test]
fn test_clone_keeps_resource_alive() {
    let (engine, session) = common::session();
    let stream = session.create_media_stream("s").unwrap();
    let handle = stream.native_handle();
    let clone = stream.clone();

    drop(stream);
    assert_eq!(engine.release_count(handle), 0);
    assert!(!clone.is_disposed());

    clone.dispose();
    assert_eq!(engine.release_count(handle), 1);
}

#[test]
fn test_dropped_session_tears_down() {
    common::init_tracing();
    let engine = Arc::new(LoopbackEngine::new());
    let stream = {
        let session = Session::create(engine.clone(), &ContextOptions::software(5)).unwrap();
        session.create_media_stream("s").unwrap()
    };

    assert!(stream.is_disposed());
    assert_eq!(engine.live_contexts(), 0);
    assert!(engine.live_objects().is_empty());
    assert!(engine.violations().is_empty());
}

#[test]
fn test_wrapper_dropped_after_session() {
    let (engine, session) = common::session();
    let stream = session.create_media_stream("s").unwrap();
    drop(session);
    drop(stream);
    assert_eq!(engine.journal().iter().filter(|c| matches!(c, Call::Release(..))).count(), 1);
    assert!(engine.violations().is_empty());
}

#[test]
fn test_duplicate_context_id_is_allocation_failure() {
    common::init_tracing();
    let engine = Arc::new(LoopbackEngine::new());
    let _first = Session::create(engine.clone(), &ContextOptions::software(3)).unwrap();
    let err = Session::create(engine.clone(), &ContextOptions::software(3)).unwrap_err();
    assert!(err.is_allocation_failure());
    assert_eq!(engine.live_contexts(), 1);
}

#[test]
fn test_allocation_failure_produces_no_wrapper() {
    let (engine, session) = common::session();
    engine.fail_next_allocations(1);

    let err = session.create_video_renderer().unwrap_err();
    assert!(err.is_allocation_failure());
    assert_eq!(session.live_resources(), 0);

    assert!(session.create_video_renderer().is_ok());
}

#[test]
fn test_resolve_finds_registered_wrapper() {
    let (_engine, session) = common::session();
    let renderer = session.create_video_renderer().unwrap();

    let resolved = session.resolve(renderer.native_handle()).unwrap();
    assert_eq!(resolved.kind(), ResourceKind::VideoRenderer);
    assert_eq!(resolved.native_handle(), renderer.native_handle());
    assert_eq!(resolved.session_id(), SessionId(1));
}

#[test]
fn test_destroy_resource() {
    let (engine, session) = common::session();
    let stream = session.create_media_stream("s").unwrap();
    let handle = stream.native_handle();

    session.destroy_resource(&stream).unwrap();
    assert!(stream.is_disposed());
    assert_eq!(engine.release_count(handle), 1);

    // Destroying again is a no-op
    session.destroy_resource(&stream).unwrap();
    assert_eq!(engine.release_count(handle), 1);
}

#[test]
fn test_destroy_resource_of_other_session_rejected() {
    common::init_tracing();
    let engine = Arc::new(LoopbackEngine::new());
    let first = Session::create(engine.clone(), &ContextOptions::software(10)).unwrap();
    let second = Session::create(engine.clone(), &ContextOptions::software(11)).unwrap();
    let stream = first.create_media_stream("s").unwrap();

    assert!(second.destroy_resource(&stream).is_err());
    assert!(!stream.is_disposed());
}

#[test]
fn test_recycled_handle_registers_cleanly() {
    common::init_tracing();
    let engine = Arc::new(LoopbackEngine::new().with_handle_recycling());
    let session = Session::create(engine.clone(), &ContextOptions::software(1)).unwrap();

    let first = session.create_media_stream("first").unwrap();
    let handle = first.native_handle();
    first.dispose();

    let second = session.create_media_stream("second").unwrap();
    assert_eq!(second.native_handle(), handle, "engine reused the handle value");
    assert!(session.resolve(handle).is_some());
}

/// An engine that hands out the same handle for every allocation.
struct StuckEngine {
    inner: LoopbackEngine,
}

impl Engine for StuckEngine {
    fn hardware_encoder_supported(&self) -> bool {
        self.inner.hardware_encoder_supported()
    }

    fn create_context(
        &self,
        id: SessionId,
        encoder_type: EncoderType,
        for_test: bool,
    ) -> rtc_bridge::Result<rtc_bridge::ContextHandle> {
        self.inner.create_context(id, encoder_type, for_test)
    }

    fn destroy_context(&self, id: SessionId) {
        self.inner.destroy_context(id)
    }

    fn encoder_type(&self, ctx: rtc_bridge::ContextHandle) -> EncoderType {
        self.inner.encoder_type(ctx)
    }

    fn allocate(
        &self,
        _ctx: rtc_bridge::ContextHandle,
        _request: &Allocation,
    ) -> rtc_bridge::Result<rtc_bridge::NativeHandle> {
        Ok(rtc_bridge::NativeHandle::from_raw(0x42))
    }

    fn release(
        &self,
        ctx: rtc_bridge::ContextHandle,
        kind: ResourceKind,
        handle: rtc_bridge::NativeHandle,
    ) {
        self.inner.release(ctx, kind, handle)
    }

    fn invoke(
        &self,
        ctx: rtc_bridge::ContextHandle,
        handle: rtc_bridge::NativeHandle,
        op: rtc_bridge::Operation,
    ) -> rtc_bridge::Result<rtc_bridge::Reply> {
        self.inner.invoke(ctx, handle, op)
    }

    fn sender_capabilities(
        &self,
        ctx: rtc_bridge::ContextHandle,
        kind: rtc_bridge::TrackKind,
    ) -> rtc_bridge::Result<rtc_bridge::RtpCapabilities> {
        self.inner.sender_capabilities(ctx, kind)
    }

    fn receiver_capabilities(
        &self,
        ctx: rtc_bridge::ContextHandle,
        kind: rtc_bridge::TrackKind,
    ) -> rtc_bridge::Result<rtc_bridge::RtpCapabilities> {
        self.inner.receiver_capabilities(ctx, kind)
    }
}

#[test]
fn test_duplicate_handle_is_reported() {
    common::init_tracing();
    let engine = Arc::new(StuckEngine {
        inner: LoopbackEngine::new(),
    });
    let session = Session::create(engine.clone(), &ContextOptions::software(1)).unwrap();

    let first = session.create_video_renderer().unwrap();
    let err = session.create_video_renderer().unwrap_err();

    assert!(err.is_duplicate_handle());
    // The first wrapper still owns the handle
    assert!(!first.is_disposed());
    assert_eq!(session.live_resources(), 1);
    let resolved = session.resolve(first.native_handle()).unwrap();
    assert_eq!(resolved.native_handle(), first.native_handle());
}

#[test]
fn test_wrapper_teardown_on_other_threads_races_session_dispose() {
    common::init_tracing();
    const WORKERS: usize = 8;

    for round in 0..50 {
        let engine = Arc::new(LoopbackEngine::new());
        let session = Session::create(engine.clone(), &ContextOptions::software(round)).unwrap();

        let streams: Vec<_> = (0..WORKERS)
            .map(|i| session.create_media_stream(&format!("s{}", i)).unwrap())
            .collect();
        let handles: Vec<_> = streams.iter().map(|s| s.native_handle()).collect();

        let barrier = Arc::new(Barrier::new(WORKERS + 1));
        let workers: Vec<_> = streams
            .into_iter()
            .enumerate()
            .map(|(i, stream)| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    if i % 2 == 0 {
                        stream.dispose();
                    } else {
                        drop(stream);
                    }
                })
            })
            .collect();

        barrier.wait();
        session.dispose();
        for worker in workers {
            worker.join().unwrap();
        }

        assert!(engine.violations().is_empty(), "{:?}", engine.violations());
        assert!(engine.live_objects().is_empty());
        for handle in handles {
            assert_eq!(engine.release_count(handle), 1, "{} released once", handle);
        }
        assert_eq!(
            engine.journal().last(),
            Some(&Call::DestroyContext(SessionId(round)))
        );
    }
}
