//! # confsync
//!
//! Keeps an in-memory copy of a monitoring server's configuration in step
//! with the relational store that owns it.
//!
//! ## What this crate provides
//!
//! - **Changeset Engine** - per-table diff of a live query result against the
//!   cache, tagging rows as add, update or remove
//! - **Entity comparators** - typed records, pre-processing hooks and field
//!   comparison for every synchronized table
//! - **Copy-on-write macro cache** - `{$MACRO:context}` resolution through host
//!   and template inheritance, readable without locks while it is updated
//! - **Sync driver** - dependency-ordered stages run once per cycle
//!
//! The SQL driver is not part of this crate: implement [`ConfigDatabase`] for
//! it, or use [`MemoryDatabase`].
//!
//! ## Example
//!
//! ```ignore
//! let cache = Arc::new(ConfigCache::new(&config.cache));
//! let syncer = Arc::new(ConfigSyncer::new(db, cache.clone(), config.sync.clone())?);
//! tokio::spawn(syncer.run(shutdown_rx));
//!
//! let timeout = cache.resolve_macro(&[hostid], "{$TIMEOUT}", None);
//! ```

mod changeset;
pub mod config;
mod entities;
mod errors;
pub mod expression;
pub mod macros;
pub mod metrics;
mod storage;
mod store;
mod string_pool;
mod sync;
pub mod utils;

pub use changeset::*;
pub use config::*;
pub use entities::*;
pub use errors::*;
pub use expression::*;
pub use macros::*;
pub use storage::*;
pub use store::*;
pub use string_pool::*;
pub use sync::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
