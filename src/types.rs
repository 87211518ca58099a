//! Type definitions and enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a native engine context, chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The family of native object a handle refers to.
///
/// The engine needs the kind to pick the matching release entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A peer connection.
    PeerConnection,
    /// A data channel opened on a peer connection.
    DataChannel,
    /// A media stream grouping tracks.
    MediaStream,
    /// An audio track.
    AudioTrack,
    /// A video track.
    VideoTrack,
    /// The source feeding audio tracks.
    AudioTrackSource,
    /// The source feeding video tracks.
    VideoTrackSource,
    /// A sink rendering decoded video frames.
    VideoRenderer,
    /// A statistics report collected from a peer connection.
    StatsReport,
}

impl ResourceKind {
    /// Stable lowercase name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::PeerConnection => "peer_connection",
            ResourceKind::DataChannel => "data_channel",
            ResourceKind::MediaStream => "media_stream",
            ResourceKind::AudioTrack => "audio_track",
            ResourceKind::VideoTrack => "video_track",
            ResourceKind::AudioTrackSource => "audio_track_source",
            ResourceKind::VideoTrackSource => "video_track_source",
            ResourceKind::VideoRenderer => "video_renderer",
            ResourceKind::StatsReport => "stats_report",
        }
    }

    /// Whether this kind is a media stream track.
    pub fn is_track(&self) -> bool {
        matches!(self, ResourceKind::AudioTrack | ResourceKind::VideoTrack)
    }

    /// Position in the session teardown sweep; lower ranks are released
    /// first so dependents never outlive what they hang off.
    pub fn teardown_rank(&self) -> u8 {
        match self {
            ResourceKind::StatsReport => 0,
            ResourceKind::DataChannel => 1,
            ResourceKind::VideoRenderer => 2,
            ResourceKind::MediaStream => 3,
            ResourceKind::AudioTrack | ResourceKind::VideoTrack => 4,
            ResourceKind::AudioTrackSource | ResourceKind::VideoTrackSource => 5,
            ResourceKind::PeerConnection => 6,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ResourceKind> for i32 {
    fn from(kind: ResourceKind) -> i32 {
        match kind {
            ResourceKind::PeerConnection => 0,
            ResourceKind::DataChannel => 1,
            ResourceKind::MediaStream => 2,
            ResourceKind::AudioTrack => 3,
            ResourceKind::VideoTrack => 4,
            ResourceKind::AudioTrackSource => 5,
            ResourceKind::VideoTrackSource => 6,
            ResourceKind::VideoRenderer => 7,
            ResourceKind::StatsReport => 8,
        }
    }
}

/// Video encoder implementation requested for a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderType {
    /// Software encoder, always available.
    Software,
    /// Hardware encoder; creation fails when the platform has none.
    #[default]
    Hardware,
}

impl From<EncoderType> for i32 {
    fn from(encoder: EncoderType) -> i32 {
        match encoder {
            EncoderType::Software => 0,
            EncoderType::Hardware => 1,
        }
    }
}

impl TryFrom<i32> for EncoderType {
    type Error = i32;

    fn try_from(value: i32) -> std::result::Result<Self, i32> {
        match value {
            0 => Ok(EncoderType::Software),
            1 => Ok(EncoderType::Hardware),
            other => Err(other),
        }
    }
}

/// Media kind of a track or transceiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Audio.
    Audio,
    /// Video.
    Video,
}

impl From<TrackKind> for i32 {
    fn from(kind: TrackKind) -> i32 {
        match kind {
            TrackKind::Audio => 0,
            TrackKind::Video => 1,
        }
    }
}

/// Session description type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// An offer.
    Offer,
    /// A provisional answer.
    Pranswer,
    /// A final answer.
    Answer,
    /// Rollback to the last stable state.
    Rollback,
}

impl From<SdpType> for i32 {
    fn from(sdp_type: SdpType) -> i32 {
        match sdp_type {
            SdpType::Offer => 0,
            SdpType::Pranswer => 1,
            SdpType::Answer => 2,
            SdpType::Rollback => 3,
        }
    }
}

/// An SDP blob together with its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Description type.
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    /// SDP text.
    pub sdp: String,
}

impl SessionDescription {
    /// Create a new description.
    pub fn new(sdp_type: SdpType, sdp: impl Into<String>) -> Self {
        Self {
            sdp_type,
            sdp: sdp.into(),
        }
    }
}

/// Options for opening a data channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataChannelInit {
    /// Deliver messages in order.
    pub ordered: Option<bool>,
    /// Maximum lifetime of an unacknowledged message, in milliseconds.
    pub max_packet_life_time: Option<i32>,
    /// Maximum number of retransmissions.
    pub max_retransmits: Option<i32>,
    /// Sub-protocol name.
    pub protocol: Option<String>,
    /// Channel negotiated out of band.
    pub negotiated: Option<bool>,
    /// Channel id when negotiated out of band.
    pub id: Option<i32>,
}

/// An ICE server entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    /// STUN/TURN urls.
    pub urls: Vec<String>,
    /// TURN username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// TURN credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Which candidates ICE may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceTransportPolicy {
    /// Only relay candidates.
    Relay,
    /// All candidates.
    All,
}

/// Peer connection configuration, passed to the engine as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerConnectionConfig {
    /// ICE servers.
    pub ice_servers: Vec<IceServer>,
    /// Candidate filtering policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ice_transport_policy: Option<IceTransportPolicy>,
    /// Number of pre-gathered candidates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ice_candidate_pool_size: Option<i32>,
}

/// One codec the engine can send or receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpCodecCapability {
    /// e.g. `video/VP8`.
    pub mime_type: String,
    /// Clock rate in Hz.
    pub clock_rate: Option<i32>,
    /// Audio channel count.
    pub channels: Option<i32>,
    /// Format parameters.
    pub sdp_fmtp_line: Option<String>,
}

/// One RTP header extension the engine supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtpHeaderExtensionCapability {
    /// Extension URI.
    pub uri: String,
}

/// Codec capabilities for one media kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpCapabilities {
    /// Supported codecs.
    pub codecs: Vec<RtpCodecCapability>,
    /// Supported header extensions.
    pub header_extensions: Vec<RtpHeaderExtensionCapability>,
}

/// Outcome of initializing a video encoder for a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecInitializationResult {
    /// The encoder has not been set up yet.
    #[default]
    NotInitialized,
    /// The encoder is ready.
    Success,
    /// No driver for the hardware encoder.
    DriverNotInstalled,
    /// The installed driver is too old.
    DriverVersionDoesNotSupportApi,
    /// The encoder API could not be loaded.
    ApiNotFound,
    /// The encoder refused the parameters.
    EncoderInitializationFailed,
}

impl From<i32> for CodecInitializationResult {
    fn from(value: i32) -> Self {
        match value {
            1 => CodecInitializationResult::Success,
            2 => CodecInitializationResult::DriverNotInstalled,
            3 => CodecInitializationResult::DriverVersionDoesNotSupportApi,
            4 => CodecInitializationResult::ApiNotFound,
            5 => CodecInitializationResult::EncoderInitializationFailed,
            _ => CodecInitializationResult::NotInitialized,
        }
    }
}

/// Error category reported by the native engine for a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RtcErrorType {
    /// No error.
    #[default]
    None,
    /// Operation not supported.
    UnsupportedOperation,
    /// Parameter value not supported.
    UnsupportedParameter,
    /// Parameter malformed.
    InvalidParameter,
    /// Parameter out of range.
    InvalidRange,
    /// Parse failure, usually of SDP.
    SyntaxError,
    /// Operation not valid in the current signaling state.
    InvalidState,
    /// Attempted modification not allowed.
    InvalidModification,
    /// Transport failure.
    NetworkError,
    /// Out of some native resource.
    ResourceExhausted,
    /// Engine bug or unknown failure.
    InternalError,
    /// Failure carrying extra data.
    OperationErrorWithData,
}

impl From<i32> for RtcErrorType {
    fn from(value: i32) -> Self {
        match value {
            0 => RtcErrorType::None,
            1 => RtcErrorType::UnsupportedOperation,
            2 => RtcErrorType::UnsupportedParameter,
            3 => RtcErrorType::InvalidParameter,
            4 => RtcErrorType::InvalidRange,
            5 => RtcErrorType::SyntaxError,
            6 => RtcErrorType::InvalidState,
            7 => RtcErrorType::InvalidModification,
            8 => RtcErrorType::NetworkError,
            9 => RtcErrorType::ResourceExhausted,
            11 => RtcErrorType::OperationErrorWithData,
            _ => RtcErrorType::InternalError,
        }
    }
}

impl fmt::Display for RtcErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
