//! Engine backed by the linked native plugin.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use super::{Allocation, Engine, Operation, Reply};
use crate::error::{Error, Result};
use crate::ffi::{self, check_error, ContextHandle, NativeHandle};
use crate::types::{
    CodecInitializationResult, DataChannelInit, EncoderType, ResourceKind, RtpCapabilities,
    RtcErrorType, SessionDescription, SessionId, TrackKind,
};

fn c_string(value: &str, what: &str) -> Result<CString> {
    CString::new(value).map_err(|_| Error::InvalidArgument(format!("{} contains null byte", what)))
}

/// Take ownership of a plugin-allocated string.
///
/// # Safety
///
/// `ptr` must be null or a string allocated by the plugin.
unsafe fn take_string(ptr: *mut c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let s = CStr::from_ptr(ptr).to_string_lossy().into_owned();
    ffi::webrtc_free_string(ptr);
    Some(s)
}

fn option_flag(value: Option<bool>) -> i32 {
    value.map(i32::from).unwrap_or(-1)
}

/// Forwards every call to the native plugin.
///
/// The plugin is process-global; construct one `NativeEngine` and share it.
#[derive(Debug, Default)]
pub struct NativeEngine {
    _private: (),
}

impl NativeEngine {
    /// Create the engine.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocation_failure(kind: ResourceKind, code: i32, err: &mut ffi::RtcError) -> Error {
        let (_, message) = unsafe { ffi::take_error(err) };
        Error::NativeAllocationFailure {
            kind: kind.name(),
            message: message.unwrap_or_else(|| format!("error code {}", code)),
        }
    }

    fn set_description(
        ctx: ContextHandle,
        peer: NativeHandle,
        desc: Option<&SessionDescription>,
        remote: bool,
    ) -> Result<Reply> {
        let sdp_c = desc.map(|d| c_string(&d.sdp, "sdp")).transpose()?;
        let c_desc = desc.zip(sdp_c.as_ref()).map(|(d, sdp)| ffi::RtcSessionDescription {
            sdp_type: d.sdp_type.into(),
            sdp: sdp.as_ptr(),
        });
        let desc_ptr = c_desc
            .as_ref()
            .map(|d| d as *const ffi::RtcSessionDescription)
            .unwrap_or(ptr::null());

        unsafe {
            let mut err = ffi::RtcError::default();
            let code = if remote {
                ffi::webrtc_peer_set_remote_description(ctx, peer, desc_ptr, &mut err)
            } else {
                ffi::webrtc_peer_set_local_description(ctx, peer, desc_ptr, &mut err)
            };
            check_error(code, &mut err)?;
        }
        Ok(Reply::Unit)
    }

    fn capabilities(
        &self,
        ctx: ContextHandle,
        kind: TrackKind,
        sender: bool,
    ) -> Result<RtpCapabilities> {
        let json = unsafe {
            let mut out: *mut c_char = ptr::null_mut();
            let mut err = ffi::RtcError::default();
            let code = if sender {
                ffi::webrtc_sender_capabilities_json(ctx, kind.into(), &mut out, &mut err)
            } else {
                ffi::webrtc_receiver_capabilities_json(ctx, kind.into(), &mut out, &mut err)
            };
            check_error(code, &mut err)?;
            take_string(out)
        };

        match json {
            Some(json) => serde_json::from_str(&json).map_err(|e| Error::NativeOperation {
                code: RtcErrorType::InternalError,
                message: format!("malformed capabilities: {}", e),
            }),
            None => Ok(RtpCapabilities::default()),
        }
    }
}

impl Engine for NativeEngine {
    fn hardware_encoder_supported(&self) -> bool {
        unsafe { ffi::webrtc_hardware_encoder_supported() }
    }

    fn create_context(
        &self,
        id: SessionId,
        encoder_type: EncoderType,
        for_test: bool,
    ) -> Result<ContextHandle> {
        unsafe {
            let mut handle = ContextHandle::invalid();
            let mut err = ffi::RtcError::default();
            let code = ffi::webrtc_context_create(
                id.0,
                encoder_type.into(),
                for_test,
                &mut handle,
                &mut err,
            );
            if code != ffi::RTC_OK || !handle.is_valid() {
                let (_, message) = ffi::take_error(&mut err);
                return Err(Error::NativeAllocationFailure {
                    kind: "context",
                    message: message.unwrap_or_else(|| format!("error code {}", code)),
                });
            }
            ffi::take_error(&mut err);
            Ok(handle)
        }
    }

    fn destroy_context(&self, id: SessionId) {
        unsafe { ffi::webrtc_context_destroy(id.0) }
    }

    fn encoder_type(&self, ctx: ContextHandle) -> EncoderType {
        let raw = unsafe { ffi::webrtc_context_encoder_type(ctx) };
        EncoderType::try_from(raw).unwrap_or_default()
    }

    fn allocate(&self, ctx: ContextHandle, request: &Allocation) -> Result<NativeHandle> {
        let kind = request.kind();
        let mut handle = NativeHandle::invalid();
        let mut err = ffi::RtcError::default();

        let code = match request {
            Allocation::PeerConnection { config } => {
                let config_c = config.as_deref().map(|c| c_string(c, "config")).transpose()?;
                unsafe {
                    ffi::webrtc_create_peer_connection(
                        ctx,
                        config_c.as_ref().map(|c| c.as_ptr()).unwrap_or(ptr::null()),
                        &mut handle,
                        &mut err,
                    )
                }
            }
            Allocation::DataChannel { peer, label, init } => {
                let label_c = c_string(label, "label")?;
                let DataChannelInit {
                    ordered,
                    max_packet_life_time,
                    max_retransmits,
                    protocol,
                    negotiated,
                    id,
                } = init;
                let protocol_c = protocol
                    .as_deref()
                    .map(|p| c_string(p, "protocol"))
                    .transpose()?;
                let c_init = ffi::RtcDataChannelInit {
                    ordered: option_flag(*ordered),
                    max_packet_life_time: max_packet_life_time.unwrap_or(-1),
                    max_retransmits: max_retransmits.unwrap_or(-1),
                    protocol: protocol_c.as_ref().map(|p| p.as_ptr()).unwrap_or(ptr::null()),
                    negotiated: option_flag(*negotiated),
                    id: id.unwrap_or(-1),
                };
                unsafe {
                    ffi::webrtc_create_data_channel(
                        ctx,
                        *peer,
                        label_c.as_ptr(),
                        &c_init,
                        &mut handle,
                        &mut err,
                    )
                }
            }
            Allocation::MediaStream { label } => {
                let label_c = c_string(label, "label")?;
                unsafe {
                    ffi::webrtc_create_media_stream(ctx, label_c.as_ptr(), &mut handle, &mut err)
                }
            }
            Allocation::AudioTrackSource => unsafe {
                ffi::webrtc_create_track_source(ctx, TrackKind::Audio.into(), &mut handle, &mut err)
            },
            Allocation::VideoTrackSource => unsafe {
                ffi::webrtc_create_track_source(ctx, TrackKind::Video.into(), &mut handle, &mut err)
            },
            Allocation::AudioTrack { label, source } | Allocation::VideoTrack { label, source } => {
                let track_kind = if kind == ResourceKind::AudioTrack {
                    TrackKind::Audio
                } else {
                    TrackKind::Video
                };
                let label_c = c_string(label, "label")?;
                unsafe {
                    ffi::webrtc_create_track(
                        ctx,
                        track_kind.into(),
                        label_c.as_ptr(),
                        *source,
                        &mut handle,
                        &mut err,
                    )
                }
            }
            Allocation::VideoRenderer => unsafe {
                ffi::webrtc_create_video_renderer(ctx, &mut handle, &mut err)
            },
            Allocation::StatsReport { peer } => unsafe {
                ffi::webrtc_create_stats_report(ctx, *peer, &mut handle, &mut err)
            },
        };

        if code != ffi::RTC_OK || !handle.is_valid() {
            return Err(Self::allocation_failure(kind, code, &mut err));
        }
        unsafe { ffi::take_error(&mut err) };
        Ok(handle)
    }

    fn release(&self, ctx: ContextHandle, kind: ResourceKind, handle: NativeHandle) {
        unsafe { ffi::webrtc_release(ctx, kind.into(), handle) }
    }

    fn invoke(&self, ctx: ContextHandle, handle: NativeHandle, op: Operation) -> Result<Reply> {
        match op {
            Operation::SetLocalDescription(desc) => {
                Self::set_description(ctx, handle, desc.as_ref(), false)
            }
            Operation::SetRemoteDescription(desc) => {
                Self::set_description(ctx, handle, Some(&desc), true)
            }
            Operation::ClosePeer => {
                unsafe { ffi::webrtc_peer_close(ctx, handle) };
                Ok(Reply::Unit)
            }
            Operation::SendData(data) => unsafe {
                let mut err = ffi::RtcError::default();
                let code =
                    ffi::webrtc_data_channel_send(ctx, handle, data.as_ptr(), data.len(), &mut err);
                check_error(code, &mut err)?;
                Ok(Reply::Unit)
            },
            Operation::DataChannelLabel => {
                let label = unsafe { take_string(ffi::webrtc_data_channel_label(ctx, handle)) };
                Ok(Reply::Text(label.unwrap_or_default()))
            }
            Operation::CloseDataChannel => {
                unsafe { ffi::webrtc_data_channel_close(ctx, handle) };
                Ok(Reply::Unit)
            }
            Operation::AddTrack(track) => {
                let added = unsafe { ffi::webrtc_media_stream_add_track(ctx, handle, track) };
                Ok(Reply::Bool(added))
            }
            Operation::RemoveTrack(track) => {
                let removed = unsafe { ffi::webrtc_media_stream_remove_track(ctx, handle, track) };
                Ok(Reply::Bool(removed))
            }
            Operation::TrackEnabled => {
                Ok(Reply::Bool(unsafe { ffi::webrtc_track_enabled(ctx, handle) }))
            }
            Operation::SetTrackEnabled(enabled) => {
                unsafe { ffi::webrtc_track_set_enabled(ctx, handle, enabled) };
                Ok(Reply::Unit)
            }
            Operation::StopTrack => {
                unsafe { ffi::webrtc_track_stop(ctx, handle) };
                Ok(Reply::Unit)
            }
            Operation::SetVideoEncoderParameter { width, height } => {
                let width = i32::try_from(width)
                    .map_err(|_| Error::InvalidArgument(format!("width {} out of range", width)))?;
                let height = i32::try_from(height).map_err(|_| {
                    Error::InvalidArgument(format!("height {} out of range", height))
                })?;
                unsafe {
                    let mut err = ffi::RtcError::default();
                    let code = ffi::webrtc_set_video_encoder_parameter(
                        ctx, handle, width, height, &mut err,
                    );
                    check_error(code, &mut err)?;
                }
                Ok(Reply::Unit)
            }
            Operation::EncoderInitializationResult => {
                let raw = unsafe { ffi::webrtc_encoder_initialization_result(ctx, handle) };
                Ok(Reply::Initialization(CodecInitializationResult::from(raw)))
            }
            Operation::RendererId => {
                Ok(Reply::Id(unsafe { ffi::webrtc_video_renderer_id(ctx, handle) }))
            }
            Operation::StatsJson => {
                let json = unsafe { take_string(ffi::webrtc_stats_report_json(ctx, handle)) };
                Ok(Reply::Text(json.unwrap_or_else(|| "{}".to_string())))
            }
        }
    }

    fn sender_capabilities(&self, ctx: ContextHandle, kind: TrackKind) -> Result<RtpCapabilities> {
        self.capabilities(ctx, kind, true)
    }

    fn receiver_capabilities(
        &self,
        ctx: ContextHandle,
        kind: TrackKind,
    ) -> Result<RtpCapabilities> {
        self.capabilities(ctx, kind, false)
    }
}
