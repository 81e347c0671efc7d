//! # semantic-host
//!
//! The host side of the semantic editor engine bridge.
//!
//! The engine runs inside the host's event loop and owns none of its I/O. This
//! crate gives it:
//!
//! - cooperative scheduling of work units and futures ([`scheduler`])
//! - WebSocket and HTTP fetch transports delivering to engine handlers ([`transport`])
//! - a file tree merged from incremental metadata fetches ([`file_tree`])
//! - one lazily constructed, shared engine instance ([`EngineHandle`])
//!
//! all wired together by [`Host`] from a single [`HostConfig`].

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod logging;

pub use semantic_host_file_tree as file_tree;
pub use semantic_host_handle as handle;
pub use semantic_host_scheduler as scheduler;
pub use semantic_host_transport as transport;

pub use config::{HostConfig, LoggingConfig};
pub use engine::EngineHandle;
pub use error::{HostError, Result};
pub use host::Host;
