//! Media streams, tracks, sources, renderers and stats reports.

use crate::engine::Operation;
use crate::error::{Error, Result};
use crate::resource::define_wrapper;
use crate::types::{CodecInitializationResult, ResourceKind, TrackKind};

define_wrapper!(
    /// A group of tracks.
    MediaStream,
    [MediaStream]
);

define_wrapper!(
    /// An audio or video track.
    MediaStreamTrack,
    [AudioTrack, VideoTrack]
);

define_wrapper!(
    /// The source feeding audio or video tracks.
    TrackSource,
    [AudioTrackSource, VideoTrackSource]
);

define_wrapper!(
    /// A sink that receives decoded video frames.
    VideoRenderer,
    [VideoRenderer]
);

define_wrapper!(
    /// A statistics snapshot from
    /// [`PeerConnection::stats_report`](crate::PeerConnection::stats_report).
    StatsReport,
    [StatsReport]
);

impl MediaStream {
    /// Add `track` to the stream. Returns `false` if it was already there.
    pub fn add_track(&self, track: &MediaStreamTrack) -> Result<bool> {
        let track = self.foreign_track(track)?;
        self.resource.invoke(Operation::AddTrack(track))?.into_bool()
    }

    /// Remove `track` from the stream. Returns `false` if it was not there.
    pub fn remove_track(&self, track: &MediaStreamTrack) -> Result<bool> {
        let track = self.foreign_track(track)?;
        self.resource
            .invoke(Operation::RemoveTrack(track))?
            .into_bool()
    }

    fn foreign_track(&self, track: &MediaStreamTrack) -> Result<crate::ffi::NativeHandle> {
        if !self.resource.same_session(track.resource()) {
            return Err(Error::InvalidArgument(
                "track belongs to another session".to_string(),
            ));
        }
        track.resource().checked_handle()
    }
}

impl MediaStreamTrack {
    /// Audio or video.
    pub fn track_kind(&self) -> TrackKind {
        match self.resource.kind() {
            ResourceKind::AudioTrack => TrackKind::Audio,
            _ => TrackKind::Video,
        }
    }

    /// Whether the track produces media.
    pub fn enabled(&self) -> Result<bool> {
        self.resource.invoke(Operation::TrackEnabled)?.into_bool()
    }

    /// Mute or unmute the track.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.resource
            .invoke(Operation::SetTrackEnabled(enabled))?
            .into_unit()
    }

    /// Stop the track permanently. The handle stays valid until dispose.
    pub fn stop(&self) -> Result<()> {
        self.resource.invoke(Operation::StopTrack)?.into_unit()
    }

    /// Configure the encoder for a video track.
    pub fn set_video_encoder_parameter(&self, width: u32, height: u32) -> Result<()> {
        self.require_video()?;
        self.resource
            .invoke(Operation::SetVideoEncoderParameter { width, height })?
            .into_unit()
    }

    /// How encoder setup went for a video track.
    pub fn initialization_result(&self) -> Result<CodecInitializationResult> {
        self.require_video()?;
        self.resource
            .invoke(Operation::EncoderInitializationResult)?
            .into_initialization()
    }

    fn require_video(&self) -> Result<()> {
        if self.track_kind() == TrackKind::Video {
            Ok(())
        } else {
            Err(Error::InvalidArgument(
                "encoder parameters apply to video tracks only".to_string(),
            ))
        }
    }
}

impl TrackSource {
    /// Audio or video.
    pub fn track_kind(&self) -> TrackKind {
        match self.resource.kind() {
            ResourceKind::AudioTrackSource => TrackKind::Audio,
            _ => TrackKind::Video,
        }
    }
}

impl VideoRenderer {
    /// Id the engine assigned to this renderer.
    pub fn id(&self) -> Result<u32> {
        self.resource.invoke(Operation::RendererId)?.into_id()
    }
}

impl StatsReport {
    /// The report as raw JSON text.
    pub fn to_json(&self) -> Result<String> {
        self.resource.invoke(Operation::StatsJson)?.into_text()
    }

    /// The report parsed into a JSON value.
    pub fn stats(&self) -> Result<serde_json::Value> {
        let json = self.to_json()?;
        serde_json::from_str(&json).map_err(|e| Error::NativeOperation {
            code: crate::types::RtcErrorType::InternalError,
            message: format!("malformed stats report: {}", e),
        })
    }
}
