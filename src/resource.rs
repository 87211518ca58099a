//! Managed wrappers around native handles.
//!
//! Every wrapper shares one [`ResourceCell`]: the handle, its kind and the
//! owning session. The handle is taken out of the cell with a single atomic
//! swap made under the session's context read guard, so whichever caller
//! gets there first (explicit `dispose`, the session teardown sweep, or
//! `Drop` of the last clone) performs the native release before the context
//! can be destroyed, and every other caller sees a null handle.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::engine::{Operation, Reply};
use crate::error::{Error, Result};
use crate::ffi::NativeHandle;
use crate::session::SessionCore;
use crate::types::{ResourceKind, SessionId};

/// Contract shared by every object that owns a native handle.
pub trait NativeResource: Send + Sync {
    /// The handle, null once disposed.
    fn native_handle(&self) -> NativeHandle;

    /// What the handle refers to.
    fn kind(&self) -> ResourceKind;

    /// Release the native object. Idempotent.
    fn dispose(&self);

    /// Whether `dispose` already ran.
    fn is_disposed(&self) -> bool {
        !self.native_handle().is_valid()
    }
}

pub(crate) struct ResourceCell {
    handle: AtomicU64,
    kind: ResourceKind,
    session: Arc<SessionCore>,
}

impl ResourceCell {
    pub(crate) fn new(handle: NativeHandle, kind: ResourceKind, session: Arc<SessionCore>) -> Self {
        Self {
            handle: AtomicU64::new(handle.as_raw()),
            kind,
            session,
        }
    }

    pub(crate) fn take_handle(&self) -> Option<NativeHandle> {
        let handle = NativeHandle::from_raw(self.handle.swap(0, Ordering::AcqRel));
        handle.is_valid().then_some(handle)
    }

    /// Forget the handle without releasing it.
    ///
    /// Used when the cell never made it into the registry and the native
    /// object is owned elsewhere.
    pub(crate) fn detach(&self) {
        self.handle.store(0, Ordering::Release);
    }

    fn checked_handle(&self) -> Result<NativeHandle> {
        let handle = NativeHandle::from_raw(self.handle.load(Ordering::Acquire));
        if handle.is_valid() {
            Ok(handle)
        } else {
            Err(Error::disposed())
        }
    }
}

impl NativeResource for ResourceCell {
    fn native_handle(&self) -> NativeHandle {
        NativeHandle::from_raw(self.handle.load(Ordering::Acquire))
    }

    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn dispose(&self) {
        self.session.release_cell(self);
    }
}

impl Drop for ResourceCell {
    fn drop(&mut self) {
        // Disposed and detached cells never touch the session locks
        if !self.native_handle().is_valid() {
            return;
        }
        if let Some(handle) = self.session.release_cell(self) {
            debug!(kind = %self.kind, %handle, "resource dropped without dispose, released");
        }
    }
}

/// An untyped wrapper over one native handle.
///
/// Clones share the handle. The native object is released by the first
/// call to [`Resource::dispose`], by the owning session's teardown, or when
/// the last clone is dropped, whichever comes first.
#[derive(Clone)]
pub struct Resource {
    cell: Arc<ResourceCell>,
}

impl Resource {
    pub(crate) fn from_cell(cell: Arc<ResourceCell>) -> Self {
        Self { cell }
    }

    /// The handle, null once disposed.
    pub fn native_handle(&self) -> NativeHandle {
        self.cell.native_handle()
    }

    /// What the handle refers to.
    pub fn kind(&self) -> ResourceKind {
        self.cell.kind
    }

    /// Id of the session that created this resource.
    pub fn session_id(&self) -> SessionId {
        self.cell.session.id()
    }

    /// Release the native object. Safe to call any number of times.
    pub fn dispose(&self) {
        self.cell.dispose();
    }

    /// Whether the native object was released.
    pub fn is_disposed(&self) -> bool {
        self.cell.is_disposed()
    }

    /// Forward `op` to the native object.
    ///
    /// Fails with [`Error::InvalidState`] after dispose instead of handing a
    /// null handle to the engine.
    pub(crate) fn invoke(&self, op: Operation) -> Result<Reply> {
        let handle = self.cell.checked_handle()?;
        self.cell.session.invoke(handle, op)
    }

    /// The live handle, or `InvalidState`.
    pub(crate) fn checked_handle(&self) -> Result<NativeHandle> {
        self.cell.checked_handle()
    }

    pub(crate) fn session(&self) -> &Arc<SessionCore> {
        &self.cell.session
    }

    pub(crate) fn same_session(&self, other: &Resource) -> bool {
        Arc::ptr_eq(&self.cell.session, &other.cell.session)
    }
}

impl NativeResource for Resource {
    fn native_handle(&self) -> NativeHandle {
        self.cell.native_handle()
    }

    fn kind(&self) -> ResourceKind {
        self.cell.kind
    }

    fn dispose(&self) {
        self.cell.dispose();
    }
}

impl AsRef<Resource> for Resource {
    fn as_ref(&self) -> &Resource {
        self
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("kind", &self.cell.kind)
            .field("handle", &self.native_handle())
            .field("session", &self.session_id())
            .finish()
    }
}

/// Define a typed wrapper over [`Resource`] restricted to some kinds.
macro_rules! define_wrapper {
    ($(#[$meta:meta])* $name:ident, [$($kind:ident),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name {
            resource: $crate::resource::Resource,
        }

        impl $name {
            /// Kinds this wrapper accepts.
            pub const KINDS: &'static [$crate::types::ResourceKind] =
                &[$($crate::types::ResourceKind::$kind),+];

            pub(crate) fn from_resource(resource: $crate::resource::Resource) -> Self {
                debug_assert!(Self::KINDS.contains(&resource.kind()));
                Self { resource }
            }

            /// The handle, null once disposed.
            pub fn native_handle(&self) -> $crate::ffi::NativeHandle {
                self.resource.native_handle()
            }

            /// Release the native object. Safe to call any number of times.
            pub fn dispose(&self) {
                self.resource.dispose();
            }

            /// Whether the native object was released.
            pub fn is_disposed(&self) -> bool {
                self.resource.is_disposed()
            }

            /// The untyped wrapper.
            pub fn resource(&self) -> &$crate::resource::Resource {
                &self.resource
            }
        }

        impl AsRef<$crate::resource::Resource> for $name {
            fn as_ref(&self) -> &$crate::resource::Resource {
                &self.resource
            }
        }

        impl TryFrom<$crate::resource::Resource> for $name {
            type Error = $crate::error::Error;

            fn try_from(resource: $crate::resource::Resource) -> $crate::error::Result<Self> {
                if Self::KINDS.contains(&resource.kind()) {
                    Ok(Self { resource })
                } else {
                    Err($crate::error::Error::InvalidArgument(format!(
                        "{} cannot wrap a {}",
                        stringify!($name),
                        resource.kind()
                    )))
                }
            }
        }

        impl $crate::resource::NativeResource for $name {
            fn native_handle(&self) -> $crate::ffi::NativeHandle {
                self.resource.native_handle()
            }

            fn kind(&self) -> $crate::types::ResourceKind {
                self.resource.kind()
            }

            fn dispose(&self) {
                self.resource.dispose();
            }
        }
    };
}

pub(crate) use define_wrapper;
