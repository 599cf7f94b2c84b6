//! Node configuration for the synchronizer.
//!
//! Values are layered: built-in defaults, then the TOML file named by
//! `CONFIG_PATH`, then `CONFSYNC__*` environment variables (`__` separates
//! nesting levels, e.g. `CONFSYNC__SYNC__INTERVAL_IN_SEC`).
mod cache;
mod sync;

pub use cache::*;
pub use sync::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

const ENV_PREFIX: &str = "CONFSYNC";

/// Settings of one synchronizer process.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SyncNodeConfig {
    /// Synchronization cycle parameters
    #[serde(default)]
    pub sync: SyncConfig,
    /// Configuration cache sizing
    #[serde(default)]
    pub cache: CacheConfig,
}

impl SyncNodeConfig {
    /// Reads defaults, `CONFIG_PATH` and the environment. Not validated:
    /// call [`Self::validate`] once every override is applied.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/confsync.toml");
    /// std::env::set_var("CONFSYNC__SYNC__INTERVAL_IN_SEC", "30");
    /// let cfg = SyncNodeConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Layers the file at `path` over `self`; environment variables still win.
    /// Not validated.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every subsystem and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.sync.validate()?;
        self.cache.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
