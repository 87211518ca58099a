//! Handle types for opaque references to native engine objects.
//!
//! Each handle type is a newtype wrapper around u64 to provide type safety.
//! The value `0` is the null sentinel.

/// Macro to define a handle type.
macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(C)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            _h: u64,
        }

        impl $name {
            /// Create an invalid (null) handle.
            #[inline]
            pub const fn invalid() -> Self {
                Self { _h: 0 }
            }

            /// Wrap a raw value received from the engine.
            #[inline]
            pub const fn from_raw(raw: u64) -> Self {
                Self { _h: raw }
            }

            /// The raw value, `0` when null.
            #[inline]
            pub const fn as_raw(&self) -> u64 {
                self._h
            }

            /// Check if this handle is valid (non-zero).
            #[inline]
            pub const fn is_valid(&self) -> bool {
                self._h != 0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:#x}", self._h)
            }
        }
    };
}

define_handle!(
    /// Opaque handle to a resource allocated inside a native context.
    NativeHandle
);
define_handle!(
    /// Opaque handle to a native engine context.
    ContextHandle
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sentinel() {
        assert!(!NativeHandle::invalid().is_valid());
        assert!(!NativeHandle::default().is_valid());
        assert_eq!(NativeHandle::from_raw(0), NativeHandle::invalid());
        assert!(ContextHandle::from_raw(7).is_valid());
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(NativeHandle::from_raw(255).to_string(), "0xff");
    }
}
