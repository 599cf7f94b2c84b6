use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SyncConfig {
    /// Seconds between two synchronization cycles
    ///
    /// Range: 1-3600
    /// Default: 10
    #[serde(default = "default_interval_in_sec")]
    pub interval_in_sec: u64,

    /// A stage taking longer than this is logged as a warning
    ///
    /// Default: 1000
    #[serde(default = "default_slow_sync_warn_ms")]
    pub slow_sync_warn_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_in_sec: default_interval_in_sec(),
            slow_sync_warn_ms: default_slow_sync_warn_ms(),
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=3600).contains(&self.interval_in_sec) {
            return Err(Error::Config(ConfigError::Message(format!(
                "sync interval_in_sec must be between 1 and 3600, got {}",
                self.interval_in_sec
            ))));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_in_sec)
    }

    pub fn slow_sync_warn(&self) -> Duration {
        Duration::from_millis(self.slow_sync_warn_ms)
    }
}

fn default_interval_in_sec() -> u64 {
    10
}

fn default_slow_sync_warn_ms() -> u64 {
    1000
}
