//! In-process engine that stands in for the native plugin.
//!
//! `LoopbackEngine` hands out handles from a counter, keeps a table of the
//! objects it believes are alive, and records every call it receives in a
//! journal. Calls that a correct bridge never makes (releasing a handle
//! twice, releasing after the context is gone, destroying a context that
//! still owns objects) are recorded as violations and logged.

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, error};

use super::{Allocation, Engine, Operation, Reply};
use crate::error::{Error, Result};
use crate::ffi::{ContextHandle, NativeHandle};
use crate::types::{
    CodecInitializationResult, EncoderType, ResourceKind, RtcErrorType, RtpCapabilities,
    SessionId, TrackKind,
};

/// One call received by a [`LoopbackEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `create_context` succeeded.
    CreateContext(SessionId),
    /// `destroy_context` was called.
    DestroyContext(SessionId),
    /// `allocate` produced a handle.
    Allocate(ResourceKind, NativeHandle),
    /// `release` was called.
    Release(ResourceKind, NativeHandle),
    /// `invoke` was called.
    Invoke(NativeHandle, &'static str),
}

struct ContextEntry {
    handle: ContextHandle,
    encoder_type: EncoderType,
}

struct NativeObject {
    ctx: ContextHandle,
    kind: ResourceKind,
    label: String,
    closed: bool,
    enabled: bool,
    tracks: Vec<NativeHandle>,
    initialization: CodecInitializationResult,
    renderer_id: u32,
    peer: NativeHandle,
}

impl NativeObject {
    fn new(ctx: ContextHandle, kind: ResourceKind) -> Self {
        Self {
            ctx,
            kind,
            label: String::new(),
            closed: false,
            enabled: true,
            tracks: Vec::new(),
            initialization: CodecInitializationResult::NotInitialized,
            renderer_id: 0,
            peer: NativeHandle::invalid(),
        }
    }
}

#[derive(Default)]
struct LoopbackState {
    next_handle: u64,
    next_renderer_id: u32,
    free_handles: BTreeSet<u64>,
    contexts: HashMap<SessionId, ContextEntry>,
    objects: HashMap<NativeHandle, NativeObject>,
    journal: Vec<Call>,
    violations: Vec<String>,
    pending_allocation_failures: usize,
}

impl LoopbackState {
    fn next_raw(&mut self, recycle: bool) -> u64 {
        if recycle {
            if let Some(raw) = self.free_handles.pop_first() {
                return raw;
            }
        }
        self.next_handle += 1;
        self.next_handle
    }

    fn context_is_live(&self, ctx: ContextHandle) -> bool {
        self.contexts.values().any(|c| c.handle == ctx)
    }

    fn violation(&mut self, message: String) {
        error!(%message, "loopback engine protocol violation");
        self.violations.push(message);
    }

    fn object(
        &self,
        ctx: ContextHandle,
        handle: NativeHandle,
        expected: &[ResourceKind],
    ) -> Result<&NativeObject> {
        let object = self
            .objects
            .get(&handle)
            .filter(|o| o.ctx == ctx)
            .ok_or_else(|| native_error(RtcErrorType::InvalidParameter, "unknown handle"))?;
        if !expected.contains(&object.kind) {
            return Err(native_error(
                RtcErrorType::InvalidParameter,
                format!("expected {:?}, got {}", expected, object.kind),
            ));
        }
        Ok(object)
    }
}

const TRACK_KINDS: &[ResourceKind] = &[ResourceKind::AudioTrack, ResourceKind::VideoTrack];

fn native_error(code: RtcErrorType, message: impl Into<String>) -> Error {
    Error::NativeOperation {
        code,
        message: message.into(),
    }
}

/// An [`Engine`] that lives entirely in process.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rtc_bridge::{ContextOptions, LoopbackEngine, Session};
///
/// let engine = Arc::new(LoopbackEngine::new());
/// let session = Session::create(engine.clone(), &ContextOptions::default())?;
/// let peer = session.create_peer_connection(None)?;
/// session.dispose();
///
/// assert!(peer.is_disposed());
/// assert!(engine.violations().is_empty());
/// # Ok::<(), rtc_bridge::Error>(())
/// ```
pub struct LoopbackEngine {
    hardware_encoder: bool,
    recycle_handles: bool,
    state: Mutex<LoopbackState>,
}

impl LoopbackEngine {
    /// Create an engine that reports a hardware encoder.
    pub fn new() -> Self {
        Self {
            hardware_encoder: true,
            recycle_handles: false,
            state: Mutex::new(LoopbackState::default()),
        }
    }

    /// Report no hardware encoder.
    pub fn without_hardware_encoder(mut self) -> Self {
        self.hardware_encoder = false;
        self
    }

    /// Hand released handle values out again, lowest first.
    pub fn with_handle_recycling(mut self) -> Self {
        self.recycle_handles = true;
        self
    }

    /// Make the next `count` allocations fail.
    pub fn fail_next_allocations(&self, count: usize) {
        self.state.lock().pending_allocation_failures += count;
    }

    /// Every call received so far, in order.
    pub fn journal(&self) -> Vec<Call> {
        self.state.lock().journal.clone()
    }

    /// How many times `handle` was passed to `release`.
    pub fn release_count(&self, handle: NativeHandle) -> usize {
        self.state
            .lock()
            .journal
            .iter()
            .filter(|call| matches!(call, Call::Release(_, h) if *h == handle))
            .count()
    }

    /// Handles the engine still considers alive.
    pub fn live_objects(&self) -> Vec<NativeHandle> {
        let mut handles: Vec<_> = self.state.lock().objects.keys().copied().collect();
        handles.sort();
        handles
    }

    /// Number of contexts not yet destroyed.
    pub fn live_contexts(&self) -> usize {
        self.state.lock().contexts.len()
    }

    /// Calls a correct bridge never makes.
    pub fn violations(&self) -> Vec<String> {
        self.state.lock().violations.clone()
    }

    fn codecs_json(&self, encoder: EncoderType, kind: TrackKind) -> serde_json::Value {
        match kind {
            TrackKind::Audio => json!({
                "codecs": [
                    {"mimeType": "audio/opus", "clockRate": 48000, "channels": 2,
                     "sdpFmtpLine": "minptime=10;useinbandfec=1"},
                    {"mimeType": "audio/PCMU", "clockRate": 8000, "channels": 1},
                ],
                "headerExtensions": [
                    {"uri": "urn:ietf:params:rtp-hdrext:ssrc-audio-level"},
                ],
            }),
            TrackKind::Video => {
                let mut codecs = vec![
                    json!({"mimeType": "video/VP8", "clockRate": 90000}),
                    json!({"mimeType": "video/VP9", "clockRate": 90000,
                           "sdpFmtpLine": "profile-id=0"}),
                ];
                if encoder == EncoderType::Hardware && self.hardware_encoder {
                    codecs.push(json!({
                        "mimeType": "video/H264", "clockRate": 90000,
                        "sdpFmtpLine": "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f"
                    }));
                }
                json!({
                    "codecs": codecs,
                    "headerExtensions": [
                        {"uri": "urn:ietf:params:rtp-hdrext:toffset"},
                        {"uri": "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time"},
                    ],
                })
            }
        }
    }

    fn capabilities(&self, ctx: ContextHandle, kind: TrackKind) -> Result<RtpCapabilities> {
        let encoder = {
            let state = self.state.lock();
            state
                .contexts
                .values()
                .find(|c| c.handle == ctx)
                .map(|c| c.encoder_type)
                .ok_or_else(|| native_error(RtcErrorType::InvalidState, "unknown context"))?
        };
        // Round-trip through text like the plugin's JSON export
        let text = self.codecs_json(encoder, kind).to_string();
        serde_json::from_str(&text)
            .map_err(|e| native_error(RtcErrorType::InternalError, e.to_string()))
    }
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for LoopbackEngine {
    fn hardware_encoder_supported(&self) -> bool {
        self.hardware_encoder
    }

    fn create_context(
        &self,
        id: SessionId,
        encoder_type: EncoderType,
        _for_test: bool,
    ) -> Result<ContextHandle> {
        let mut state = self.state.lock();
        if state.contexts.contains_key(&id) {
            return Err(Error::NativeAllocationFailure {
                kind: "context",
                message: format!("context {} already exists", id),
            });
        }

        let handle = ContextHandle::from_raw(state.next_raw(false));
        state.contexts.insert(
            id,
            ContextEntry {
                handle,
                encoder_type,
            },
        );
        state.journal.push(Call::CreateContext(id));
        debug!(%id, ctx = %handle, "loopback context created");
        Ok(handle)
    }

    fn destroy_context(&self, id: SessionId) {
        let mut state = self.state.lock();
        state.journal.push(Call::DestroyContext(id));

        let Some(entry) = state.contexts.remove(&id) else {
            state.violation(format!("destroy of unknown context {}", id));
            return;
        };

        let leaked: Vec<NativeHandle> = state
            .objects
            .iter()
            .filter(|(_, o)| o.ctx == entry.handle)
            .map(|(h, _)| *h)
            .collect();
        for handle in &leaked {
            state.objects.remove(handle);
        }
        if !leaked.is_empty() {
            state.violation(format!(
                "context {} destroyed while owning {} objects",
                id,
                leaked.len()
            ));
        }
    }

    fn encoder_type(&self, ctx: ContextHandle) -> EncoderType {
        let state = self.state.lock();
        state
            .contexts
            .values()
            .find(|c| c.handle == ctx)
            .map(|c| c.encoder_type)
            .unwrap_or_default()
    }

    fn allocate(&self, ctx: ContextHandle, request: &Allocation) -> Result<NativeHandle> {
        let kind = request.kind();
        let mut state = self.state.lock();

        let fail = |message: &str| Error::NativeAllocationFailure {
            kind: kind.name(),
            message: message.to_string(),
        };

        if state.pending_allocation_failures > 0 {
            state.pending_allocation_failures -= 1;
            return Err(fail("injected failure"));
        }
        if !state.context_is_live(ctx) {
            return Err(fail("unknown context"));
        }

        let mut object = NativeObject::new(ctx, kind);
        match request {
            Allocation::PeerConnection { config } => {
                if let Some(config) = config {
                    serde_json::from_str::<serde_json::Value>(config)
                        .map_err(|e| fail(&format!("invalid configuration: {}", e)))?;
                }
            }
            Allocation::DataChannel { peer, label, .. } => {
                let parent = state
                    .object(ctx, *peer, &[ResourceKind::PeerConnection])
                    .map_err(|e| fail(&e.to_string()))?;
                if parent.closed {
                    return Err(fail("peer connection is closed"));
                }
                object.label = label.clone();
                object.peer = *peer;
            }
            Allocation::MediaStream { label } => object.label = label.clone(),
            Allocation::AudioTrack { label, source } => {
                state
                    .object(ctx, *source, &[ResourceKind::AudioTrackSource])
                    .map_err(|e| fail(&e.to_string()))?;
                object.label = label.clone();
            }
            Allocation::VideoTrack { label, source } => {
                state
                    .object(ctx, *source, &[ResourceKind::VideoTrackSource])
                    .map_err(|e| fail(&e.to_string()))?;
                object.label = label.clone();
            }
            Allocation::StatsReport { peer } => {
                state
                    .object(ctx, *peer, &[ResourceKind::PeerConnection])
                    .map_err(|e| fail(&e.to_string()))?;
                object.peer = *peer;
            }
            Allocation::VideoRenderer => {
                state.next_renderer_id += 1;
                object.renderer_id = state.next_renderer_id;
            }
            Allocation::AudioTrackSource | Allocation::VideoTrackSource => {}
        }

        let handle = NativeHandle::from_raw(state.next_raw(self.recycle_handles));
        state.objects.insert(handle, object);
        state.journal.push(Call::Allocate(kind, handle));
        Ok(handle)
    }

    fn release(&self, ctx: ContextHandle, kind: ResourceKind, handle: NativeHandle) {
        let mut state = self.state.lock();
        state.journal.push(Call::Release(kind, handle));

        if !state.context_is_live(ctx) {
            state.violation(format!("release of {} {} after context destroy", kind, handle));
            return;
        }
        let recorded = state.objects.get(&handle).map(|o| (o.ctx, o.kind));
        match recorded {
            None => state.violation(format!("double release of {} {}", kind, handle)),
            Some((owner, allocated)) if owner != ctx || allocated != kind => {
                state.violation(format!(
                    "release of {} {} does not match allocation as {}",
                    kind, handle, allocated
                ));
            }
            Some(_) => {
                state.objects.remove(&handle);
                if kind.is_track() {
                    // Streams drop their reference to a released track
                    for object in state.objects.values_mut() {
                        object.tracks.retain(|t| *t != handle);
                    }
                }
                if self.recycle_handles {
                    state.free_handles.insert(handle.as_raw());
                }
            }
        }
    }

    fn invoke(&self, ctx: ContextHandle, handle: NativeHandle, op: Operation) -> Result<Reply> {
        let mut state = self.state.lock();
        state.journal.push(Call::Invoke(handle, op.name()));

        if !state.context_is_live(ctx) {
            state.violation(format!("{} on {} after context destroy", op.name(), handle));
            return Err(native_error(RtcErrorType::InvalidState, "context destroyed"));
        }
        if !state.objects.contains_key(&handle) {
            state.violation(format!("{} on released handle {}", op.name(), handle));
            return Err(native_error(RtcErrorType::InvalidState, "handle released"));
        }

        match op {
            Operation::SetLocalDescription(desc) => {
                let peer = state.object(ctx, handle, &[ResourceKind::PeerConnection])?;
                if peer.closed {
                    return Err(native_error(
                        RtcErrorType::InvalidState,
                        "peer connection is closed",
                    ));
                }
                if desc.is_some_and(|d| d.sdp.trim().is_empty()) {
                    return Err(native_error(RtcErrorType::SyntaxError, "empty sdp"));
                }
                Ok(Reply::Unit)
            }
            Operation::SetRemoteDescription(desc) => {
                let peer = state.object(ctx, handle, &[ResourceKind::PeerConnection])?;
                if peer.closed {
                    return Err(native_error(
                        RtcErrorType::InvalidState,
                        "peer connection is closed",
                    ));
                }
                if !desc.sdp.starts_with("v=0") {
                    return Err(native_error(RtcErrorType::SyntaxError, "sdp must start with v=0"));
                }
                Ok(Reply::Unit)
            }
            Operation::ClosePeer => {
                state.object(ctx, handle, &[ResourceKind::PeerConnection])?;
                if let Some(peer) = state.objects.get_mut(&handle) {
                    peer.closed = true;
                }
                Ok(Reply::Unit)
            }
            Operation::SendData(_) => {
                let channel = state.object(ctx, handle, &[ResourceKind::DataChannel])?;
                if channel.closed {
                    return Err(native_error(RtcErrorType::InvalidState, "data channel is closed"));
                }
                Ok(Reply::Unit)
            }
            Operation::DataChannelLabel => {
                let channel = state.object(ctx, handle, &[ResourceKind::DataChannel])?;
                Ok(Reply::Text(channel.label.clone()))
            }
            Operation::CloseDataChannel => {
                state.object(ctx, handle, &[ResourceKind::DataChannel])?;
                if let Some(channel) = state.objects.get_mut(&handle) {
                    channel.closed = true;
                }
                Ok(Reply::Unit)
            }
            Operation::AddTrack(track) => {
                state.object(ctx, handle, &[ResourceKind::MediaStream])?;
                state.object(ctx, track, TRACK_KINDS)?;
                let stream = state
                    .objects
                    .get_mut(&handle)
                    .ok_or_else(|| native_error(RtcErrorType::InternalError, "stream vanished"))?;
                if stream.tracks.contains(&track) {
                    return Ok(Reply::Bool(false));
                }
                stream.tracks.push(track);
                Ok(Reply::Bool(true))
            }
            Operation::RemoveTrack(track) => {
                state.object(ctx, handle, &[ResourceKind::MediaStream])?;
                let stream = state
                    .objects
                    .get_mut(&handle)
                    .ok_or_else(|| native_error(RtcErrorType::InternalError, "stream vanished"))?;
                let before = stream.tracks.len();
                stream.tracks.retain(|t| *t != track);
                Ok(Reply::Bool(stream.tracks.len() != before))
            }
            Operation::TrackEnabled => {
                let track = state.object(ctx, handle, TRACK_KINDS)?;
                Ok(Reply::Bool(track.enabled && !track.closed))
            }
            Operation::SetTrackEnabled(enabled) => {
                state.object(ctx, handle, TRACK_KINDS)?;
                if let Some(track) = state.objects.get_mut(&handle) {
                    track.enabled = enabled;
                }
                Ok(Reply::Unit)
            }
            Operation::StopTrack => {
                state.object(ctx, handle, TRACK_KINDS)?;
                if let Some(track) = state.objects.get_mut(&handle) {
                    track.closed = true;
                }
                Ok(Reply::Unit)
            }
            Operation::SetVideoEncoderParameter { width, height } => {
                state.object(ctx, handle, &[ResourceKind::VideoTrack])?;
                if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
                    return Err(native_error(
                        RtcErrorType::InvalidRange,
                        format!("unsupported frame size {}x{}", width, height),
                    ));
                }
                let hardware = state
                    .contexts
                    .values()
                    .any(|c| c.handle == ctx && c.encoder_type == EncoderType::Hardware);
                let result = if hardware && !self.hardware_encoder {
                    CodecInitializationResult::DriverNotInstalled
                } else {
                    CodecInitializationResult::Success
                };
                if let Some(track) = state.objects.get_mut(&handle) {
                    track.initialization = result;
                }
                Ok(Reply::Unit)
            }
            Operation::EncoderInitializationResult => {
                let track = state.object(ctx, handle, &[ResourceKind::VideoTrack])?;
                Ok(Reply::Initialization(track.initialization))
            }
            Operation::RendererId => {
                let renderer = state.object(ctx, handle, &[ResourceKind::VideoRenderer])?;
                Ok(Reply::Id(renderer.renderer_id))
            }
            Operation::StatsJson => {
                let report = state.object(ctx, handle, &[ResourceKind::StatsReport])?;
                let peer = report.peer;
                let channels = state
                    .objects
                    .values()
                    .filter(|o| o.kind == ResourceKind::DataChannel && o.peer == peer)
                    .count();
                let stats = json!({
                    "peerConnection": peer.as_raw(),
                    "dataChannelsOpened": channels,
                });
                Ok(Reply::Text(stats.to_string()))
            }
        }
    }

    fn sender_capabilities(&self, ctx: ContextHandle, kind: TrackKind) -> Result<RtpCapabilities> {
        self.capabilities(ctx, kind)
    }

    fn receiver_capabilities(
        &self,
        ctx: ContextHandle,
        kind: TrackKind,
    ) -> Result<RtpCapabilities> {
        self.capabilities(ctx, kind)
    }
}
