//! Read-only access to the relational configuration store.
//!
//! The SQL driver itself lives outside this crate. Anything implementing
//! [`ConfigDatabase`] can feed the synchronizer; [`MemoryDatabase`] is the
//! bundled in-memory adaptor.

mod adaptors;
mod database;
pub mod schema;

pub use adaptors::*;
pub use database::*;
