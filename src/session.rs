//! Sessions: one native engine context plus the wrappers created in it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::channel::DataChannel;
use crate::config::ContextOptions;
use crate::engine::{Allocation, Engine, Operation, Reply};
use crate::error::{Error, Result};
use crate::ffi::{ContextHandle, NativeHandle};
use crate::media::{MediaStream, MediaStreamTrack, StatsReport, TrackSource, VideoRenderer};
use crate::peer::PeerConnection;
use crate::registry::HandleRegistry;
use crate::resource::{NativeResource, Resource, ResourceCell};
use crate::types::{
    DataChannelInit, EncoderType, PeerConnectionConfig, ResourceKind, RtpCapabilities,
    SessionId, TrackKind,
};

/// Observable lifecycle of a [`Session`].
///
/// A session is `Active` as soon as [`Session::create`] returns; a failed
/// creation produces no session at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The native context is alive.
    Active,
    /// Teardown ran; the session is inert.
    Disposed,
}

/// State shared between a session and the wrappers it created.
pub(crate) struct SessionCore {
    id: SessionId,
    engine: Arc<dyn Engine>,
    /// Null once the native context is destroyed. Releases and forwarded
    /// operations hold the read side; teardown takes the write side.
    context: RwLock<ContextHandle>,
    disposed: AtomicBool,
    registry: Mutex<HandleRegistry<ResourceCell>>,
}

impl SessionCore {
    pub(crate) fn id(&self) -> SessionId {
        self.id
    }

    /// Take the handle out of `cell`, unregister it and release it, unless
    /// the context is gone. Returns the handle if this call took it.
    ///
    /// The read guard is held from the swap to the native release, so
    /// teardown cannot destroy the context while a release is half done.
    pub(crate) fn release_cell(&self, cell: &ResourceCell) -> Option<NativeHandle> {
        let ctx = self.context.read();
        let handle = cell.take_handle()?;
        let kind = cell.kind();
        // Unregister first so a recycled handle value never meets a stale entry
        self.registry.lock().unregister(handle);
        if ctx.is_valid() {
            self.engine.release(*ctx, kind, handle);
            debug!(session = %self.id, %kind, %handle, "resource released");
        } else {
            debug!(
                session = %self.id,
                %kind,
                %handle,
                "context already destroyed, release skipped"
            );
        }
        Some(handle)
    }

    pub(crate) fn invoke(&self, handle: NativeHandle, op: Operation) -> Result<Reply> {
        let ctx = self.context.read();
        if !ctx.is_valid() {
            return Err(Error::session_disposed());
        }
        self.engine.invoke(*ctx, handle, op)
    }

    pub(crate) fn create_resource(self: &Arc<Self>, request: Allocation) -> Result<Resource> {
        let kind = request.kind();
        let ctx = self.context.read();
        if !ctx.is_valid() || self.disposed.load(Ordering::Acquire) {
            return Err(Error::session_disposed());
        }

        let handle = self.engine.allocate(*ctx, &request)?;
        let cell = Arc::new(ResourceCell::new(handle, kind, Arc::clone(self)));

        let mut registry = self.registry.lock();
        if self.disposed.load(Ordering::Acquire) {
            // Teardown started after our check; its snapshot will not see us
            drop(registry);
            cell.detach();
            self.engine.release(*ctx, kind, handle);
            return Err(Error::session_disposed());
        }
        if let Err(err) = registry.register(handle, &cell) {
            drop(registry);
            // The native object belongs to the wrapper already registered
            cell.detach();
            error!(
                session = %self.id,
                %kind,
                %handle,
                "engine returned a handle owned by a live wrapper"
            );
            return Err(err);
        }
        drop(registry);

        debug!(session = %self.id, %kind, %handle, "resource created");
        Ok(Resource::from_cell(cell))
    }

    fn dispose(&self) {
        let mut snapshot = {
            let registry = self.registry.lock();
            if self.disposed.swap(true, Ordering::AcqRel) {
                return;
            }
            registry.snapshot_values()
        };

        info!(session = %self.id, live = snapshot.len(), "disposing session");

        snapshot.sort_by_key(|cell| cell.kind().teardown_rank());
        for cell in &snapshot {
            // Tolerates cells disposed since the snapshot was taken
            cell.dispose();
        }
        drop(snapshot);
        self.registry.lock().clear();

        let mut ctx = self.context.write();
        if ctx.is_valid() {
            self.engine.destroy_context(self.id);
            *ctx = ContextHandle::invalid();
        }
        info!(session = %self.id, "session disposed");
    }
}

/// Owner of one native engine context and every resource created in it.
///
/// Disposing the session (explicitly, or by dropping it) releases every
/// resource that is still alive, then destroys the native context.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rtc_bridge::{ContextOptions, LoopbackEngine, Session};
///
/// let session = Session::create(Arc::new(LoopbackEngine::new()), &ContextOptions::default())?;
/// let peer = session.create_peer_connection(None)?;
/// let channel = peer.create_data_channel("chat", None)?;
/// channel.send_text("hello")?;
///
/// session.dispose();
/// assert!(channel.send_text("again").unwrap_err().is_invalid_state());
/// # Ok::<(), rtc_bridge::Error>(())
/// ```
pub struct Session {
    core: Arc<SessionCore>,
}

impl Session {
    /// Create a session and its native context.
    ///
    /// Fails with [`Error::UnsupportedCapability`] when a hardware encoder is
    /// requested and the engine has none, and with
    /// [`Error::NativeAllocationFailure`] when the engine cannot create the
    /// context.
    pub fn create(engine: Arc<dyn Engine>, options: &ContextOptions) -> Result<Self> {
        if options.encoder_type == EncoderType::Hardware && !engine.hardware_encoder_supported() {
            return Err(Error::UnsupportedCapability(EncoderType::Hardware));
        }

        let ctx = engine.create_context(options.id, options.encoder_type, options.for_test)?;
        info!(session = %options.id, %ctx, encoder = ?options.encoder_type, "session created");

        Ok(Self {
            core: Arc::new(SessionCore {
                id: options.id,
                engine,
                context: RwLock::new(ctx),
                disposed: AtomicBool::new(false),
                registry: Mutex::new(HandleRegistry::new()),
            }),
        })
    }

    /// The session id passed at creation.
    pub fn id(&self) -> SessionId {
        self.core.id
    }

    /// The native context handle, null once disposed.
    pub fn context_handle(&self) -> ContextHandle {
        *self.core.context.read()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        if self.is_disposed() {
            SessionState::Disposed
        } else {
            SessionState::Active
        }
    }

    /// Whether teardown has started.
    pub fn is_disposed(&self) -> bool {
        self.core.disposed.load(Ordering::Acquire)
    }

    /// Number of registered wrappers still alive.
    pub fn live_resources(&self) -> usize {
        self.core.registry.lock().live_len()
    }

    /// The encoder the native context runs with.
    pub fn encoder_type(&self) -> Result<EncoderType> {
        let ctx = self.live_context()?;
        Ok(self.core.engine.encoder_type(ctx))
    }

    /// Codecs this session can send for `kind`.
    pub fn sender_capabilities(&self, kind: TrackKind) -> Result<RtpCapabilities> {
        let ctx = self.live_context()?;
        self.core.engine.sender_capabilities(ctx, kind)
    }

    /// Codecs this session can receive for `kind`.
    pub fn receiver_capabilities(&self, kind: TrackKind) -> Result<RtpCapabilities> {
        let ctx = self.live_context()?;
        self.core.engine.receiver_capabilities(ctx, kind)
    }

    /// Allocate a native resource and register its wrapper.
    pub fn create_resource(&self, request: Allocation) -> Result<Resource> {
        self.core.create_resource(request)
    }

    /// Dispose `resource` now instead of at session teardown.
    pub fn destroy_resource<R: AsRef<Resource>>(&self, resource: &R) -> Result<()> {
        let resource = resource.as_ref();
        if !Arc::ptr_eq(resource.session(), &self.core) {
            return Err(Error::InvalidArgument(format!(
                "resource belongs to session {}, not {}",
                resource.session_id(),
                self.core.id
            )));
        }
        resource.dispose();
        Ok(())
    }

    /// The live wrapper registered for `handle`, typically one named by a
    /// native callback.
    pub fn resolve(&self, handle: NativeHandle) -> Option<Resource> {
        self.core
            .registry
            .lock()
            .lookup(handle)
            .map(Resource::from_cell)
    }

    /// Release every live resource, then the native context.
    ///
    /// Idempotent: only the first call, or the implicit call from `Drop`,
    /// does anything.
    pub fn dispose(&self) {
        self.core.dispose();
    }

    /// Create a peer connection.
    pub fn create_peer_connection(
        &self,
        config: Option<&PeerConnectionConfig>,
    ) -> Result<PeerConnection> {
        let config = config
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::InvalidArgument(format!("peer connection config: {}", e)))?;
        let resource = self.create_resource(Allocation::PeerConnection { config })?;
        Ok(PeerConnection::from_resource(resource))
    }

    /// Create an empty media stream.
    pub fn create_media_stream(&self, label: &str) -> Result<MediaStream> {
        let resource = self.create_resource(Allocation::MediaStream {
            label: label.to_string(),
        })?;
        Ok(MediaStream::from_resource(resource))
    }

    /// Create an audio track source.
    pub fn create_audio_track_source(&self) -> Result<TrackSource> {
        let resource = self.create_resource(Allocation::AudioTrackSource)?;
        Ok(TrackSource::from_resource(resource))
    }

    /// Create a video track source.
    pub fn create_video_track_source(&self) -> Result<TrackSource> {
        let resource = self.create_resource(Allocation::VideoTrackSource)?;
        Ok(TrackSource::from_resource(resource))
    }

    /// Create an audio track fed by `source`.
    pub fn create_audio_track(
        &self,
        label: &str,
        source: &TrackSource,
    ) -> Result<MediaStreamTrack> {
        let source = self.own_source(source, TrackKind::Audio)?;
        let resource = self.create_resource(Allocation::AudioTrack {
            label: label.to_string(),
            source,
        })?;
        Ok(MediaStreamTrack::from_resource(resource))
    }

    /// Create a video track fed by `source`.
    pub fn create_video_track(
        &self,
        label: &str,
        source: &TrackSource,
    ) -> Result<MediaStreamTrack> {
        let source = self.own_source(source, TrackKind::Video)?;
        let resource = self.create_resource(Allocation::VideoTrack {
            label: label.to_string(),
            source,
        })?;
        Ok(MediaStreamTrack::from_resource(resource))
    }

    /// Create a video renderer.
    pub fn create_video_renderer(&self) -> Result<VideoRenderer> {
        let resource = self.create_resource(Allocation::VideoRenderer)?;
        Ok(VideoRenderer::from_resource(resource))
    }

    fn live_context(&self) -> Result<ContextHandle> {
        let ctx = *self.core.context.read();
        if ctx.is_valid() {
            Ok(ctx)
        } else {
            Err(Error::session_disposed())
        }
    }

    fn own_source(&self, source: &TrackSource, kind: TrackKind) -> Result<NativeHandle> {
        if !Arc::ptr_eq(source.resource().session(), &self.core) {
            return Err(Error::InvalidArgument(
                "track source belongs to another session".to_string(),
            ));
        }
        if source.track_kind() != kind {
            return Err(Error::InvalidArgument(format!(
                "a {:?} track needs a {:?} source",
                kind,
                source.track_kind()
            )));
        }
        source.resource().checked_handle()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.is_disposed() {
            debug!(session = %self.core.id, "session dropped without dispose");
            self.core.dispose();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.core.id)
            .field("state", &self.state())
            .finish()
    }
}

// Child resources that hang off an existing wrapper are created through
// the wrapper's own session.
impl SessionCore {
    pub(crate) fn create_data_channel(
        self: &Arc<Self>,
        peer: NativeHandle,
        label: &str,
        init: Option<DataChannelInit>,
    ) -> Result<DataChannel> {
        let resource = self.create_resource(Allocation::DataChannel {
            peer,
            label: label.to_string(),
            init: init.unwrap_or_default(),
        })?;
        Ok(DataChannel::from_resource(resource))
    }

    pub(crate) fn create_stats_report(self: &Arc<Self>, peer: NativeHandle) -> Result<StatsReport> {
        let resource = self.create_resource(Allocation::StatsReport { peer })?;
        Ok(StatsReport::from_resource(resource))
    }
}
