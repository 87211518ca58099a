//! Error conversion utilities for FFI.

use crate::error::{Error, Result};
use crate::types::RtcErrorType;

/// Convert a native error category and optional message into a Result.
#[cfg_attr(not(feature = "native"), allow(dead_code))]
pub fn check_code(code: i32, message: Option<String>) -> Result<()> {
    match RtcErrorType::from(code) {
        RtcErrorType::None => Ok(()),
        code => Err(Error::NativeOperation {
            code,
            message: message.unwrap_or_else(|| "Unknown error".to_string()),
        }),
    }
}

/// Extract the message of a C error and free it.
///
/// # Safety
///
/// The `err` pointer must be valid and initialized.
#[cfg(feature = "native")]
pub unsafe fn take_error(err: *mut super::raw::RtcError) -> (i32, Option<String>) {
    if err.is_null() {
        return (super::raw::RTC_OK, None);
    }

    let err_ref = &*err;
    let code = err_ref.code;

    // Extract the string before freeing
    let message = if err_ref.message.is_null() {
        None
    } else {
        Some(
            std::ffi::CStr::from_ptr(err_ref.message)
                .to_string_lossy()
                .into_owned(),
        )
    };

    super::raw::webrtc_error_free(err);
    (code, message)
}

/// Check an error code and convert to Result.
///
/// # Safety
///
/// The `err` pointer must be valid and initialized.
#[cfg(feature = "native")]
pub unsafe fn check_error(code: i32, err: *mut super::raw::RtcError) -> Result<()> {
    // Free the error struct even on success (safe no-op)
    let (_, message) = take_error(err);
    check_code(code, message)
}
