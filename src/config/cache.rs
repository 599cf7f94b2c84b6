use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CacheConfig {
    /// Initial capacity of the shared string pool
    #[serde(default = "default_string_pool_capacity")]
    pub string_pool_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            string_pool_capacity: default_string_pool_capacity(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.string_pool_capacity == 0 {
            return Err(Error::Config(ConfigError::Message(
                "cache string_pool_capacity must be greater than 0".to_string(),
            )));
        }
        Ok(())
    }
}

fn default_string_pool_capacity() -> usize {
    4096
}
