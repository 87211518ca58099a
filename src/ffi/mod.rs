//! FFI bindings to the native WebRTC plugin.
//!
//! This module contains low-level C bindings. Users should prefer the
//! safe Rust wrappers in the parent modules.

pub mod error;
pub mod handles;
#[cfg(feature = "native")]
pub mod raw;

#[cfg_attr(not(feature = "native"), allow(unused_imports))]
pub use error::check_code;
#[cfg(feature = "native")]
pub use error::{check_error, take_error};
pub use handles::*;
#[cfg(feature = "native")]
pub use raw::*;
