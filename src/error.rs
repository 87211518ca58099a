//! Error types for the rtc-bridge crate.

use thiserror::Error;

use crate::ffi::NativeHandle;
use crate::types::{EncoderType, ResourceKind, RtcErrorType};

/// Result type alias for rtc-bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for rtc-bridge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The requested native capability is not available on this system.
    #[error("unsupported capability: {0:?} encoder is not available")]
    UnsupportedCapability(EncoderType),

    /// The engine could not allocate a context or resource.
    #[error("native allocation of {kind} failed: {message}")]
    NativeAllocationFailure {
        /// What was being allocated.
        kind: &'static str,
        /// Engine-supplied reason.
        message: String,
    },

    /// Two wrappers claim the same native handle.
    #[error("duplicate handle {handle} for {kind}: a live wrapper already owns it")]
    DuplicateHandle {
        /// The contested handle.
        handle: NativeHandle,
        /// Kind of the rejected wrapper.
        kind: ResourceKind,
    },

    /// Operation on a disposed wrapper or session.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// A forwarded operation failed inside the engine.
    #[error("native operation failed ({code}): {message}")]
    NativeOperation {
        /// Engine error category.
        code: RtcErrorType,
        /// Engine-supplied message.
        message: String,
    },

    /// Function argument is invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this is an unsupported capability error.
    pub fn is_unsupported_capability(&self) -> bool {
        matches!(self, Error::UnsupportedCapability(_))
    }

    /// Check if this is a use-after-dispose error.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::InvalidState(_))
    }

    /// Check if this is a duplicate handle error.
    pub fn is_duplicate_handle(&self) -> bool {
        matches!(self, Error::DuplicateHandle { .. })
    }

    /// Check if this is an allocation failure.
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, Error::NativeAllocationFailure { .. })
    }

    /// The engine error category, if this came from a forwarded operation.
    pub fn native_code(&self) -> Option<RtcErrorType> {
        match self {
            Error::NativeOperation { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn disposed() -> Self {
        Error::InvalidState("use after dispose")
    }

    pub(crate) fn session_disposed() -> Self {
        Error::InvalidState("session is disposed")
    }
}
