//! Raw C function bindings for the native plugin.
//!
//! This module contains the direct FFI bindings to the C API.
//! Users should prefer the safe Rust wrappers in the parent modules.

use std::os::raw::{c_char, c_int};

use super::handles::*;

/// Error category returned by C functions, `RTC_OK` on success.
pub type RtcErrorCode = c_int;

pub const RTC_OK: RtcErrorCode = 0;

/// C error structure. `message` is owned by the plugin and freed with
/// [`webrtc_error_free`].
#[repr(C)]
pub struct RtcError {
    pub code: RtcErrorCode,
    pub message: *mut c_char,
}

impl Default for RtcError {
    fn default() -> Self {
        Self {
            code: RTC_OK,
            message: std::ptr::null_mut(),
        }
    }
}

/// Session description structure.
#[repr(C)]
pub struct RtcSessionDescription {
    pub sdp_type: c_int,
    pub sdp: *const c_char,
}

/// Data channel options. Negative numbers mean "unset".
#[repr(C)]
pub struct RtcDataChannelInit {
    pub ordered: c_int,
    pub max_packet_life_time: c_int,
    pub max_retransmits: c_int,
    pub protocol: *const c_char,
    pub negotiated: c_int,
    pub id: c_int,
}

impl Default for RtcDataChannelInit {
    fn default() -> Self {
        Self {
            ordered: -1,
            max_packet_life_time: -1,
            max_retransmits: -1,
            protocol: std::ptr::null(),
            negotiated: -1,
            id: -1,
        }
    }
}

// External C functions
extern "C" {
    // Memory management
    pub fn webrtc_error_free(err: *mut RtcError);
    pub fn webrtc_free_string(s: *mut c_char);

    // Capabilities
    pub fn webrtc_hardware_encoder_supported() -> bool;
    pub fn webrtc_sender_capabilities_json(
        ctx: ContextHandle,
        track_kind: c_int,
        out: *mut *mut c_char,
        err: *mut RtcError,
    ) -> RtcErrorCode;
    pub fn webrtc_receiver_capabilities_json(
        ctx: ContextHandle,
        track_kind: c_int,
        out: *mut *mut c_char,
        err: *mut RtcError,
    ) -> RtcErrorCode;

    // Context
    pub fn webrtc_context_create(
        id: c_int,
        encoder_type: c_int,
        for_test: bool,
        out: *mut ContextHandle,
        err: *mut RtcError,
    ) -> RtcErrorCode;
    pub fn webrtc_context_destroy(id: c_int);
    pub fn webrtc_context_encoder_type(ctx: ContextHandle) -> c_int;

    // Allocation
    pub fn webrtc_create_peer_connection(
        ctx: ContextHandle,
        config_json: *const c_char,
        out: *mut NativeHandle,
        err: *mut RtcError,
    ) -> RtcErrorCode;
    pub fn webrtc_create_data_channel(
        ctx: ContextHandle,
        peer: NativeHandle,
        label: *const c_char,
        init: *const RtcDataChannelInit,
        out: *mut NativeHandle,
        err: *mut RtcError,
    ) -> RtcErrorCode;
    pub fn webrtc_create_media_stream(
        ctx: ContextHandle,
        label: *const c_char,
        out: *mut NativeHandle,
        err: *mut RtcError,
    ) -> RtcErrorCode;
    pub fn webrtc_create_track_source(
        ctx: ContextHandle,
        track_kind: c_int,
        out: *mut NativeHandle,
        err: *mut RtcError,
    ) -> RtcErrorCode;
    pub fn webrtc_create_track(
        ctx: ContextHandle,
        track_kind: c_int,
        label: *const c_char,
        source: NativeHandle,
        out: *mut NativeHandle,
        err: *mut RtcError,
    ) -> RtcErrorCode;
    pub fn webrtc_create_video_renderer(
        ctx: ContextHandle,
        out: *mut NativeHandle,
        err: *mut RtcError,
    ) -> RtcErrorCode;
    pub fn webrtc_create_stats_report(
        ctx: ContextHandle,
        peer: NativeHandle,
        out: *mut NativeHandle,
        err: *mut RtcError,
    ) -> RtcErrorCode;

    // Release, keyed by resource kind
    pub fn webrtc_release(ctx: ContextHandle, kind: c_int, handle: NativeHandle);

    // Peer connection
    pub fn webrtc_peer_set_local_description(
        ctx: ContextHandle,
        peer: NativeHandle,
        desc: *const RtcSessionDescription,
        err: *mut RtcError,
    ) -> RtcErrorCode;
    pub fn webrtc_peer_set_remote_description(
        ctx: ContextHandle,
        peer: NativeHandle,
        desc: *const RtcSessionDescription,
        err: *mut RtcError,
    ) -> RtcErrorCode;
    pub fn webrtc_peer_close(ctx: ContextHandle, peer: NativeHandle);

    // Data channel
    pub fn webrtc_data_channel_send(
        ctx: ContextHandle,
        channel: NativeHandle,
        data: *const u8,
        len: usize,
        err: *mut RtcError,
    ) -> RtcErrorCode;
    pub fn webrtc_data_channel_label(ctx: ContextHandle, channel: NativeHandle) -> *mut c_char;
    pub fn webrtc_data_channel_close(ctx: ContextHandle, channel: NativeHandle);

    // Media stream
    pub fn webrtc_media_stream_add_track(
        ctx: ContextHandle,
        stream: NativeHandle,
        track: NativeHandle,
    ) -> bool;
    pub fn webrtc_media_stream_remove_track(
        ctx: ContextHandle,
        stream: NativeHandle,
        track: NativeHandle,
    ) -> bool;

    // Tracks
    pub fn webrtc_track_enabled(ctx: ContextHandle, track: NativeHandle) -> bool;
    pub fn webrtc_track_set_enabled(ctx: ContextHandle, track: NativeHandle, enabled: bool);
    pub fn webrtc_track_stop(ctx: ContextHandle, track: NativeHandle);
    pub fn webrtc_set_video_encoder_parameter(
        ctx: ContextHandle,
        track: NativeHandle,
        width: c_int,
        height: c_int,
        err: *mut RtcError,
    ) -> RtcErrorCode;
    pub fn webrtc_encoder_initialization_result(ctx: ContextHandle, track: NativeHandle) -> c_int;

    // Renderer and stats
    pub fn webrtc_video_renderer_id(ctx: ContextHandle, renderer: NativeHandle) -> u32;
    pub fn webrtc_stats_report_json(ctx: ContextHandle, report: NativeHandle) -> *mut c_char;
}
