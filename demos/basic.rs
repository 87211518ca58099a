//! Basic example demonstrating the session/resource lifetime bridge.
//!
//! Run with: cargo run --example basic
//! Set RUST_LOG=debug to watch every allocation and release.

use std::sync::Arc;

use rtc_bridge::{
    Call, ContextOptions, EncoderType, Engine, LoopbackEngine, SdpType, Session,
    SessionDescription, TrackKind,
};

fn main() -> rtc_bridge::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let engine = Arc::new(LoopbackEngine::new());
    println!("Hardware encoder: {}", engine.hardware_encoder_supported());

    // Options come from RTC_BRIDGE_* variables when set
    let mut opts = ContextOptions::from_env()?;
    if opts.encoder_type == EncoderType::Hardware && !engine.hardware_encoder_supported() {
        opts.encoder_type = EncoderType::Software;
    }

    let session = Session::create(engine.clone(), &opts)?;
    println!("Session {} uses {:?}", session.id(), session.encoder_type()?);

    let caps = session.sender_capabilities(TrackKind::Video)?;
    println!("\nVideo send codecs:");
    for codec in &caps.codecs {
        println!("  {}", codec.mime_type);
    }

    println!("\n--- Peer connection ---");
    let peer = session.create_peer_connection(None)?;
    peer.set_remote_description(&SessionDescription::new(SdpType::Offer, "v=0\r\n"))?;
    peer.set_local_description(None)?;
    let channel = peer.create_data_channel("chat", None)?;
    channel.send_text("hello")?;
    println!("Channel {:?} open", channel.label()?);

    println!("\n--- Media ---");
    let source = session.create_video_track_source()?;
    let track = session.create_video_track("camera", &source)?;
    track.set_video_encoder_parameter(1280, 720)?;
    println!("Encoder: {:?}", track.initialization_result()?);
    let stream = session.create_media_stream("local")?;
    stream.add_track(&track)?;

    // Released now; the rest goes with the session
    channel.dispose();
    drop(track);

    println!("\n--- Dispose ---");
    session.dispose();
    println!("Stream disposed: {}", stream.is_disposed());

    for call in engine.journal() {
        if let Call::Release(kind, handle) | Call::Allocate(kind, handle) = &call {
            println!("  {} {} {}", call_name(&call), kind, handle);
        }
    }
    println!("Violations: {:?}", engine.violations());

    Ok(())
}

fn call_name(call: &Call) -> &'static str {
    match call {
        Call::Allocate(..) => "allocate",
        Call::Release(..) => "release",
        _ => "other",
    }
}
