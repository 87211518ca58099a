//! Weak table mapping native handles to the wrapper that owns them.
//!
//! The registry never keeps a wrapper alive. It exists so that a session
//! can find, at teardown, every wrapper the caller forgot to dispose.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::error::{Error, Result};
use crate::ffi::NativeHandle;
use crate::resource::NativeResource;

/// Handle-keyed table of non-owning wrapper references.
pub struct HandleRegistry<T: ?Sized> {
    entries: HashMap<NativeHandle, Weak<T>>,
}

impl<T: ?Sized> HandleRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Look up the live wrapper for `handle`.
    ///
    /// Returns `None` when nothing is registered or the wrapper was already
    /// dropped.
    pub fn lookup(&self, handle: NativeHandle) -> Option<Arc<T>> {
        self.entries.get(&handle).and_then(Weak::upgrade)
    }

    /// Remove the entry for `handle`. No-op when absent.
    pub fn unregister(&mut self, handle: NativeHandle) {
        self.entries.remove(&handle);
    }

    /// Point-in-time copy of every live wrapper.
    ///
    /// The returned vector does not alias the table, so the caller may
    /// dispose entries (which unregisters them) while iterating.
    pub fn snapshot_values(&self) -> Vec<Arc<T>> {
        self.entries.values().filter_map(Weak::upgrade).collect()
    }

    /// Drop every entry without disposing anything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries whose wrapper is still alive.
    pub fn live_len(&self) -> usize {
        self.entries.values().filter(|w| w.strong_count() > 0).count()
    }

    /// Number of entries, dead ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: NativeResource + ?Sized> HandleRegistry<T> {
    /// Register `wrapper` under `handle`.
    ///
    /// Re-using a slot whose wrapper is gone is fine. Claiming a handle that
    /// a different live wrapper already owns fails with
    /// [`Error::DuplicateHandle`].
    pub fn register(&mut self, handle: NativeHandle, wrapper: &Arc<T>) -> Result<()> {
        if !handle.is_valid() {
            return Err(Error::InvalidArgument(
                "cannot register a null handle".to_string(),
            ));
        }
        let weak = Arc::downgrade(wrapper);
        if let Some(existing) = self.entries.get(&handle) {
            if existing.strong_count() > 0 && !Weak::ptr_eq(existing, &weak) {
                return Err(Error::DuplicateHandle {
                    handle,
                    kind: wrapper.kind(),
                });
            }
        }
        self.entries.insert(handle, weak);
        Ok(())
    }
}

impl<T: ?Sized> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
