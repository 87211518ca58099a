//! The native call surface the bridge depends on.
//!
//! Everything the bridge asks of the native engine goes through [`Engine`].
//! Exactly one implementation is wired in per build: [`LoopbackEngine`] is
//! always available, `NativeEngine` forwards to the linked plugin and is
//! compiled with the `native` feature.

pub mod loopback;
#[cfg(feature = "native")]
pub mod native;

pub use loopback::{Call, LoopbackEngine};
#[cfg(feature = "native")]
pub use native::NativeEngine;

use crate::error::{Error, Result};
use crate::ffi::{ContextHandle, NativeHandle};
use crate::types::{
    CodecInitializationResult, DataChannelInit, EncoderType, ResourceKind, RtcErrorType,
    RtpCapabilities, SessionDescription, SessionId, TrackKind,
};

/// A request to allocate one native resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Allocation {
    /// A peer connection, optionally configured with a JSON document.
    PeerConnection { config: Option<String> },
    /// A data channel on an existing peer connection.
    DataChannel {
        peer: NativeHandle,
        label: String,
        init: DataChannelInit,
    },
    /// An empty media stream.
    MediaStream { label: String },
    /// An audio track source.
    AudioTrackSource,
    /// A video track source.
    VideoTrackSource,
    /// An audio track fed by `source`.
    AudioTrack { label: String, source: NativeHandle },
    /// A video track fed by `source`.
    VideoTrack { label: String, source: NativeHandle },
    /// A video sink.
    VideoRenderer,
    /// A statistics snapshot of a peer connection.
    StatsReport { peer: NativeHandle },
}

impl Allocation {
    /// The resource kind this request produces.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Allocation::PeerConnection { .. } => ResourceKind::PeerConnection,
            Allocation::DataChannel { .. } => ResourceKind::DataChannel,
            Allocation::MediaStream { .. } => ResourceKind::MediaStream,
            Allocation::AudioTrackSource => ResourceKind::AudioTrackSource,
            Allocation::VideoTrackSource => ResourceKind::VideoTrackSource,
            Allocation::AudioTrack { .. } => ResourceKind::AudioTrack,
            Allocation::VideoTrack { .. } => ResourceKind::VideoTrack,
            Allocation::VideoRenderer => ResourceKind::VideoRenderer,
            Allocation::StatsReport { .. } => ResourceKind::StatsReport,
        }
    }
}

/// An operation forwarded to the native object behind a handle.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Apply a local description; `None` lets the engine generate one.
    SetLocalDescription(Option<SessionDescription>),
    /// Apply a remote description.
    SetRemoteDescription(SessionDescription),
    /// Close a peer connection.
    ClosePeer,
    /// Send a binary message on a data channel.
    SendData(Vec<u8>),
    /// Read a data channel's label.
    DataChannelLabel,
    /// Close a data channel.
    CloseDataChannel,
    /// Add a track to a media stream.
    AddTrack(NativeHandle),
    /// Remove a track from a media stream.
    RemoveTrack(NativeHandle),
    /// Read a track's enabled flag.
    TrackEnabled,
    /// Set a track's enabled flag.
    SetTrackEnabled(bool),
    /// Stop a track.
    StopTrack,
    /// Configure the video encoder of a track.
    SetVideoEncoderParameter { width: u32, height: u32 },
    /// Query the encoder initialization outcome of a track.
    EncoderInitializationResult,
    /// Read a renderer's id.
    RendererId,
    /// Serialize a stats report to JSON.
    StatsJson,
}

impl Operation {
    /// Short name used in logs and journals.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::SetLocalDescription(_) => "set_local_description",
            Operation::SetRemoteDescription(_) => "set_remote_description",
            Operation::ClosePeer => "close_peer",
            Operation::SendData(_) => "send_data",
            Operation::DataChannelLabel => "data_channel_label",
            Operation::CloseDataChannel => "close_data_channel",
            Operation::AddTrack(_) => "add_track",
            Operation::RemoveTrack(_) => "remove_track",
            Operation::TrackEnabled => "track_enabled",
            Operation::SetTrackEnabled(_) => "set_track_enabled",
            Operation::StopTrack => "stop_track",
            Operation::SetVideoEncoderParameter { .. } => "set_video_encoder_parameter",
            Operation::EncoderInitializationResult => "encoder_initialization_result",
            Operation::RendererId => "renderer_id",
            Operation::StatsJson => "stats_json",
        }
    }
}

/// The value returned by a forwarded operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Nothing to return.
    Unit,
    /// A flag.
    Bool(bool),
    /// A string payload.
    Text(String),
    /// A numeric id.
    Id(u32),
    /// An encoder initialization outcome.
    Initialization(CodecInitializationResult),
}

impl Reply {
    fn unexpected(self, wanted: &str) -> Error {
        Error::NativeOperation {
            code: RtcErrorType::InternalError,
            message: format!("expected {} reply, got {:?}", wanted, self),
        }
    }

    pub(crate) fn into_unit(self) -> Result<()> {
        match self {
            Reply::Unit => Ok(()),
            other => Err(other.unexpected("unit")),
        }
    }

    pub(crate) fn into_bool(self) -> Result<bool> {
        match self {
            Reply::Bool(value) => Ok(value),
            other => Err(other.unexpected("bool")),
        }
    }

    pub(crate) fn into_text(self) -> Result<String> {
        match self {
            Reply::Text(value) => Ok(value),
            other => Err(other.unexpected("text")),
        }
    }

    pub(crate) fn into_id(self) -> Result<u32> {
        match self {
            Reply::Id(value) => Ok(value),
            other => Err(other.unexpected("id")),
        }
    }

    pub(crate) fn into_initialization(self) -> Result<CodecInitializationResult> {
        match self {
            Reply::Initialization(value) => Ok(value),
            other => Err(other.unexpected("initialization")),
        }
    }
}

/// Opaque-handle function surface of the native engine.
///
/// Implementations must be callable from any thread; the bridge serializes
/// teardown against releases itself.
pub trait Engine: Send + Sync {
    /// Whether a hardware video encoder is present.
    fn hardware_encoder_supported(&self) -> bool;

    /// Allocate the native context for session `id`.
    fn create_context(
        &self,
        id: SessionId,
        encoder_type: EncoderType,
        for_test: bool,
    ) -> Result<ContextHandle>;

    /// Destroy the native context of session `id`.
    fn destroy_context(&self, id: SessionId);

    /// Encoder the context was created with.
    fn encoder_type(&self, ctx: ContextHandle) -> EncoderType;

    /// Allocate one resource inside `ctx`.
    fn allocate(&self, ctx: ContextHandle, request: &Allocation) -> Result<NativeHandle>;

    /// Release one resource previously returned by [`Engine::allocate`].
    fn release(&self, ctx: ContextHandle, kind: ResourceKind, handle: NativeHandle);

    /// Forward `op` to the object behind `handle`.
    fn invoke(&self, ctx: ContextHandle, handle: NativeHandle, op: Operation) -> Result<Reply>;

    /// Codecs the context can send for `kind`.
    fn sender_capabilities(&self, ctx: ContextHandle, kind: TrackKind) -> Result<RtpCapabilities>;

    /// Codecs the context can receive for `kind`.
    fn receiver_capabilities(&self, ctx: ContextHandle, kind: TrackKind)
        -> Result<RtpCapabilities>;
}
