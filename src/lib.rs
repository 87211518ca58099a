//! Safe lifetime bridge over a handle-based native WebRTC engine.
//!
//! A [`Session`] owns one native engine context. Every peer connection,
//! track, data channel and friend created through it is represented by a
//! wrapper that holds one native handle and is registered, weakly, in the
//! session's [`HandleRegistry`]. The bridge guarantees:
//!
//! - at most one live wrapper per native handle;
//! - every wrapper is released exactly once, whether by explicit
//!   `dispose`, by the session teardown sweep, or when its last clone is
//!   dropped;
//! - the native context is destroyed only after every resource in it was
//!   released;
//! - any operation on a disposed wrapper fails with
//!   [`Error::InvalidState`] instead of reaching native code.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rtc_bridge::{ContextOptions, LoopbackEngine, Session};
//!
//! fn main() -> rtc_bridge::Result<()> {
//!     let engine = Arc::new(LoopbackEngine::new());
//!     let session = Session::create(engine.clone(), &ContextOptions::software(1))?;
//!
//!     let source = session.create_video_track_source()?;
//!     let track = session.create_video_track("camera", &source)?;
//!     let stream = session.create_media_stream("local")?;
//!     stream.add_track(&track)?;
//!
//!     // Explicitly released now
//!     track.dispose();
//!
//!     // Everything else is released here, then the context
//!     session.dispose();
//!     assert!(stream.is_disposed());
//!     assert!(engine.violations().is_empty());
//!     Ok(())
//! }
//! ```
//!
//! # Engines
//!
//! The native call surface is the [`Engine`] trait. [`LoopbackEngine`]
//! runs in process and is always available; with the `native` feature,
//! `NativeEngine` forwards to the linked plugin.

pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
mod ffi;
pub mod media;
pub mod peer;
pub mod registry;
pub mod resource;
pub mod session;
pub mod types;

// Re-export main types at the crate root
pub use channel::DataChannel;
pub use config::ContextOptions;
#[cfg(feature = "native")]
pub use engine::NativeEngine;
pub use engine::{Allocation, Call, Engine, LoopbackEngine, Operation, Reply};
pub use error::{Error, Result};
pub use ffi::{ContextHandle, NativeHandle};
pub use media::{MediaStream, MediaStreamTrack, StatsReport, TrackSource, VideoRenderer};
pub use peer::PeerConnection;
pub use registry::HandleRegistry;
pub use resource::{NativeResource, Resource};
pub use session::{Session, SessionState};
pub use types::{
    CodecInitializationResult, DataChannelInit, EncoderType, IceServer, IceTransportPolicy,
    PeerConnectionConfig, ResourceKind, RtcErrorType, RtpCapabilities, RtpCodecCapability,
    RtpHeaderExtensionCapability, SdpType, SessionDescription, SessionId, TrackKind,
};
