mod config_cache;
mod config_store;

pub use config_cache::*;
pub use config_store::*;
