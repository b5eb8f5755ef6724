//! Session configuration.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::{Result, SyncError};

/// Default interval between forced sync cycles, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3600;

/// Immutable configuration for one sync session.
#[derive(Debug, Clone)]
pub struct SyncConfiguration {
    /// Interval between forced sync cycles, in seconds. Must be greater than
    /// zero: the poll timer is the only bound on staleness when the push
    /// channel is quiet.
    pub poll_interval_secs: u64,

    /// Baseline for the session's first delta fetch, overriding the stored
    /// watermark. Subsequent delta fetches always use the stored watermark.
    pub initial_sync_time: Option<DateTime<Utc>>,
}

impl Default for SyncConfiguration {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            initial_sync_time: None,
        }
    }
}

impl SyncConfiguration {
    pub fn new(poll_interval_secs: u64) -> Self {
        Self {
            poll_interval_secs,
            initial_sync_time: None,
        }
    }

    pub fn with_initial_sync_time(mut self, at: DateTime<Utc>) -> Self {
        self.initial_sync_time = Some(at);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(SyncError::InvalidConfiguration(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SyncConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_secs(3600));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = SyncConfiguration::new(0);
        assert!(matches!(
            config.validate(),
            Err(SyncError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_initial_sync_time_builder() {
        let at = Utc::now();
        let config = SyncConfiguration::new(60).with_initial_sync_time(at);
        assert_eq!(config.initial_sync_time, Some(at));
    }
}
