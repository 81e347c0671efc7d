//! # semantic-host-scheduler
//!
//! Cooperative scheduling of engine work on the host event loop.
//!
//! The engine cannot block the host thread, so it chunks its computation into
//! [`WorkUnit`]s that each return control promptly. The [`Scheduler`] runs a
//! unit once per tick, yielding to the event loop in between, until the unit
//! reports completion, and then releases it.
//!
//! ```ignore
//! use semantic_host_scheduler::{Scheduler, SchedulerConfig};
//!
//! let scheduler = Scheduler::new(SchedulerConfig::default())?;
//! let invocations = scheduler.schedule(unit).wait().await?;
//! ```
//!
//! [`MicrotaskExecutor`] layers a future executor on top: engine futures are
//! polled from microtasks rather than spawned on the host runtime.

pub mod config;
pub mod error;
pub mod executor;
pub mod scheduler;

pub use config::SchedulerConfig;
pub use error::{Result, SchedulerError};
pub use executor::{run, Microtask, MicrotaskExecutor};
pub use scheduler::{ScheduledUnit, Scheduler, WorkUnit};
