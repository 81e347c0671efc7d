//! Log output setup.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{HostError, Result};

/// Install a global fmt subscriber filtered by `config.filter`.
///
/// Returns `Ok(false)` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init(config: &LoggingConfig) -> Result<bool> {
    let filter = EnvFilter::try_new(&config.filter).map_err(|e| HostError::LogFilter {
        filter: config.filter.clone(),
        message: e.to_string(),
    })?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(filter = %config.filter, "logging initialized");
    }
    Ok(installed)
}
