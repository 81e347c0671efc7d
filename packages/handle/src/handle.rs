//! Owned handles and single-handle slots.

use std::fmt;

use uuid::Uuid;

use crate::error::{HandleError, Result};

/// Unique identifier for a handle held by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(Uuid);

impl HandleId {
    /// Create a new random HandleId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a HandleId from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An engine-side object that must be handed back once the host is done with it.
///
/// `release` consumes the object, so nothing can touch it afterwards.
pub trait Release {
    /// Give the object back to the engine.
    fn release(self);
}

/// A handle exclusively held by the host between receipt and release.
///
/// Every exit path releases the inner object exactly once:
///
/// - [`Owned::release`] on a terminal outcome
/// - dropping the handle (abandonment), which releases and logs a warning
/// - [`Owned::leak`] on fatal paths, which never releases
///
/// ```rust
/// use semantic_host_handle::{Owned, Release};
///
/// struct Listing;
///
/// impl Release for Listing {
///     fn release(self) {}
/// }
///
/// let handle = Owned::new(Listing);
/// handle.release();
/// ```
pub struct Owned<T: Release> {
    id: HandleId,
    inner: Option<T>,
}

impl<T: Release> Owned<T> {
    /// Take ownership of an engine object.
    pub fn new(value: T) -> Self {
        Self::with_id(HandleId::new(), value)
    }

    /// Take ownership of an engine object under a known identity.
    pub fn with_id(id: HandleId, value: T) -> Self {
        tracing::trace!(handle = %id, "acquired handle");
        Self {
            id,
            inner: Some(value),
        }
    }

    /// The identity of this handle.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Borrow the engine object.
    pub fn get(&self) -> &T {
        match self.inner.as_ref() {
            Some(value) => value,
            None => unreachable!("handle {} used after release", self.id),
        }
    }

    /// Mutably borrow the engine object.
    pub fn get_mut(&mut self) -> &mut T {
        match self.inner.as_mut() {
            Some(value) => value,
            None => unreachable!("handle {} used after release", self.id),
        }
    }

    /// Release the engine object. Consumes the handle.
    pub fn release(mut self) {
        if let Some(value) = self.inner.take() {
            tracing::trace!(handle = %self.id, "releasing handle");
            value.release();
        }
    }

    /// Give up the engine object without releasing it.
    ///
    /// Used when the object may be in an inconsistent state and handing it
    /// back is unsafe. The leak is logged as an error.
    pub fn leak(mut self) {
        if let Some(value) = self.inner.take() {
            tracing::error!(handle = %self.id, "leaking handle without release");
            std::mem::forget(value);
        }
    }
}

impl<T: Release> Drop for Owned<T> {
    fn drop(&mut self) {
        if let Some(value) = self.inner.take() {
            tracing::warn!(handle = %self.id, "handle dropped without explicit release");
            value.release();
        }
    }
}

impl<T: Release> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owned")
            .field("id", &self.id)
            .field("held", &self.inner.is_some())
            .finish()
    }
}

/// An attachment point holding at most one handle.
///
/// The slot is filled once and emptied once; whichever of [`Slot::release`]
/// or [`Slot::take`] runs first wins, later calls observe
/// [`HandleError::Released`].
pub struct Slot<T: Release> {
    id: HandleId,
    handle: Option<Owned<T>>,
}

impl<T: Release> Slot<T> {
    /// Create a slot holding the given handle.
    pub fn new(handle: Owned<T>) -> Self {
        Self {
            id: handle.id(),
            handle: Some(handle),
        }
    }

    /// The identity of the handle this slot was created for.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Whether the slot still holds its handle.
    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    /// Run `f` against the held object.
    pub fn with<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        match self.handle.as_mut() {
            Some(handle) => Ok(f(handle.get_mut())),
            None => Err(HandleError::Released(self.id)),
        }
    }

    /// Move the handle out of the slot, leaving it empty.
    pub fn take(&mut self) -> Option<Owned<T>> {
        self.handle.take()
    }

    /// Release the held handle, leaving the slot empty.
    pub fn release(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => {
                handle.release();
                Ok(())
            }
            None => Err(HandleError::Released(self.id)),
        }
    }
}

impl<T: Release> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("id", &self.id)
            .field("attached", &self.is_attached())
            .finish()
    }
}
