//! Per-table definitions: defining query, typed record, pre-processing hook
//! and field comparator.
//!
//! Cross-entity rule: a host whose proxy or status changed marks its items for
//! a full refresh in the [`crate::SyncContext`], and the item comparator then
//! treats every item of that host as changed.

mod host;
mod item;
mod links;
mod macros;
mod settings;
mod trigger;

pub use host::*;
pub use item::*;
pub use links::*;
pub use macros::*;
pub use settings::*;
pub use trigger::*;

use crate::string_pool::StringPool;

/// Moves a record's text from the cycle pool into a long-lived pool before caching.
pub trait Rehome {
    fn rehome(
        &self,
        pool: &StringPool,
    ) -> Self;
}
