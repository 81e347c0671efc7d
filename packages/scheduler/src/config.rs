//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the microtask scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Delay between two invocations of the same work unit.
    ///
    /// Zero means "as soon as possible after yielding to the event loop".
    pub tick_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_delay: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert!(config.tick_delay.is_zero());
    }

    #[test]
    fn scheduler_config_from_json() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"tick_delay": {"secs": 0, "nanos": 5000000}}"#).unwrap();
        assert_eq!(config.tick_delay, Duration::from_millis(5));
    }

    #[test]
    fn scheduler_config_missing_fields_use_defaults() {
        let config: SchedulerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SchedulerConfig::default());
    }
}
