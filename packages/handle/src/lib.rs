//! Opaque handle protocol.
//!
//! Objects created by the engine (work units, transport handlers, listings)
//! are owned by exactly one side of the host/engine boundary at a time. The
//! host wraps each object it receives in an [`Owned`] token, which guarantees
//! the object is handed back through [`Release`] exactly once:
//!
//! - `Owned::release` consumes the token, so a released handle cannot be used
//! - dropping an unreleased token releases it (abandonment)
//! - `Owned::leak` gives the object up without release on fatal paths
//!
//! [`Slot`] holds a handle that several code paths may race to tear down;
//! only the first one gets to release it.

mod error;
mod handle;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::{HandleError, Result};
pub use handle::{HandleId, Owned, Release, Slot};
