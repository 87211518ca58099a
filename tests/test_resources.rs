//! Typed wrapper tests against the loopback engine.

mod common;

use std::sync::Arc;

use rtc_bridge::{
    CodecInitializationResult, ContextOptions, DataChannelInit, EncoderType, IceServer,
    LoopbackEngine, MediaStream, PeerConnection, PeerConnectionConfig, ResourceKind,
    RtcErrorType, SdpType, Session, SessionDescription, TrackKind,
};

#[test]
fn test_peer_connection_descriptions() {
    let (_engine, session) = common::session();
    let config = PeerConnectionConfig {
        ice_servers: vec![IceServer {
            urls: vec!["stun:stun.example.org".to_string()],
            ..Default::default()
        }],
        ..Default::default()
    };
    let peer = session.create_peer_connection(Some(&config)).unwrap();

    let offer = SessionDescription::new(SdpType::Offer, "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\n");
    peer.set_remote_description(&offer).unwrap();
    peer.set_local_description(None).unwrap();

    let bad = SessionDescription::new(SdpType::Answer, "garbage");
    let err = peer.set_remote_description(&bad).unwrap_err();
    assert_eq!(err.native_code(), Some(RtcErrorType::SyntaxError));

    peer.close().unwrap();
    let err = peer.set_local_description(None).unwrap_err();
    assert_eq!(err.native_code(), Some(RtcErrorType::InvalidState));
    // Closing does not release the handle
    assert!(!peer.is_disposed());
}

#[test]
fn test_data_channel_roundtrip() {
    let (engine, session) = common::session();
    let peer = session.create_peer_connection(None).unwrap();
    let init = DataChannelInit {
        ordered: Some(true),
        max_retransmits: Some(3),
        ..Default::default()
    };
    let channel = peer.create_data_channel("chat", Some(init)).unwrap();

    assert_eq!(channel.label().unwrap(), "chat");
    channel.send(b"\x00\x01").unwrap();
    channel.send_text("hi").unwrap();
    channel.close().unwrap();

    let err = channel.send_text("closed").unwrap_err();
    assert_eq!(err.native_code(), Some(RtcErrorType::InvalidState));

    channel.dispose();
    assert!(channel.label().unwrap_err().is_invalid_state());
    assert!(engine.violations().is_empty());
}

#[test]
fn test_data_channel_on_closed_peer_fails() {
    let (_engine, session) = common::session();
    let peer = session.create_peer_connection(None).unwrap();
    peer.close().unwrap();

    let err = peer.create_data_channel("late", None).unwrap_err();
    assert!(err.is_allocation_failure());
    assert_eq!(session.live_resources(), 1);
}

#[test]
fn test_media_stream_tracks() {
    let (engine, session) = common::session();
    let stream = session.create_media_stream("local").unwrap();
    let audio_source = session.create_audio_track_source().unwrap();
    let video_source = session.create_video_track_source().unwrap();
    let audio = session.create_audio_track("mic", &audio_source).unwrap();
    let video = session.create_video_track("cam", &video_source).unwrap();

    assert_eq!(audio.track_kind(), TrackKind::Audio);
    assert_eq!(video.track_kind(), TrackKind::Video);
    assert_eq!(audio_source.track_kind(), TrackKind::Audio);

    assert!(stream.add_track(&audio).unwrap());
    assert!(stream.add_track(&video).unwrap());
    assert!(!stream.add_track(&audio).unwrap(), "already in the stream");
    assert!(stream.remove_track(&audio).unwrap());
    assert!(!stream.remove_track(&audio).unwrap());

    video.dispose();
    assert!(stream.add_track(&video).unwrap_err().is_invalid_state());
    assert!(engine.violations().is_empty());
}

#[test]
fn test_track_needs_matching_source() {
    let (_engine, session) = common::session();
    let audio_source = session.create_audio_track_source().unwrap();
    assert!(session.create_video_track("cam", &audio_source).is_err());
    assert_eq!(session.live_resources(), 1);
}

#[test]
fn test_cross_session_track_rejected() {
    common::init_tracing();
    let engine = Arc::new(LoopbackEngine::new());
    let first = Session::create(engine.clone(), &ContextOptions::software(1)).unwrap();
    let second = Session::create(engine.clone(), &ContextOptions::software(2)).unwrap();

    let source = first.create_audio_track_source().unwrap();
    let track = first.create_audio_track("mic", &source).unwrap();
    let stream = second.create_media_stream("remote").unwrap();

    assert!(stream.add_track(&track).is_err());
    assert!(second.create_audio_track("mic", &source).is_err());
}

#[test]
fn test_track_enable_and_stop() {
    let (_engine, session) = common::session();
    let source = session.create_audio_track_source().unwrap();
    let track = session.create_audio_track("mic", &source).unwrap();

    assert!(track.enabled().unwrap());
    track.set_enabled(false).unwrap();
    assert!(!track.enabled().unwrap());
    track.set_enabled(true).unwrap();
    track.stop().unwrap();
    assert!(!track.enabled().unwrap());
}

#[test]
fn test_video_encoder_parameters() {
    let (_engine, session) = common::session();
    let source = session.create_video_track_source().unwrap();
    let track = session.create_video_track("cam", &source).unwrap();

    assert_eq!(
        track.initialization_result().unwrap(),
        CodecInitializationResult::NotInitialized
    );
    track.set_video_encoder_parameter(1280, 720).unwrap();
    assert_eq!(
        track.initialization_result().unwrap(),
        CodecInitializationResult::Success
    );

    let err = track.set_video_encoder_parameter(0, 720).unwrap_err();
    assert_eq!(err.native_code(), Some(RtcErrorType::InvalidRange));

    let audio_source = session.create_audio_track_source().unwrap();
    let audio = session.create_audio_track("mic", &audio_source).unwrap();
    assert!(audio.set_video_encoder_parameter(640, 480).is_err());
}

#[test]
fn test_video_renderer_ids_are_distinct() {
    let (_engine, session) = common::session();
    let a = session.create_video_renderer().unwrap();
    let b = session.create_video_renderer().unwrap();
    assert_ne!(a.id().unwrap(), b.id().unwrap());
}

#[test]
fn test_stats_report() {
    let (_engine, session) = common::session();
    let peer = session.create_peer_connection(None).unwrap();
    let _channel = peer.create_data_channel("a", None).unwrap();
    let report = peer.stats_report().unwrap();

    let stats = report.stats().unwrap();
    assert_eq!(stats["dataChannelsOpened"], 1);
    assert_eq!(stats["peerConnection"], peer.native_handle().as_raw());
}

#[test]
fn test_capabilities() {
    common::init_tracing();
    let engine = Arc::new(LoopbackEngine::new());
    let opts = ContextOptions {
        encoder_type: EncoderType::Hardware,
        ..ContextOptions::software(7)
    };
    let session = Session::create(engine, &opts).unwrap();

    let audio = session.sender_capabilities(TrackKind::Audio).unwrap();
    assert!(audio.codecs.iter().any(|c| c.mime_type == "audio/opus"));

    let video = session.receiver_capabilities(TrackKind::Video).unwrap();
    assert!(video.codecs.iter().any(|c| c.mime_type == "video/H264"));
    assert!(!video.header_extensions.is_empty());

    session.dispose();
    assert!(session.sender_capabilities(TrackKind::Audio).unwrap_err().is_invalid_state());
}

#[test]
fn test_typed_conversion_from_resource() {
    let (_engine, session) = common::session();
    let peer = session.create_peer_connection(None).unwrap();

    let resource = session.resolve(peer.native_handle()).unwrap();
    assert_eq!(resource.kind(), ResourceKind::PeerConnection);

    assert!(MediaStream::try_from(resource.clone()).is_err());
    let typed = PeerConnection::try_from(resource).unwrap();
    typed.close().unwrap();

    // Both wrappers share one handle
    typed.dispose();
    assert!(peer.is_disposed());
}
