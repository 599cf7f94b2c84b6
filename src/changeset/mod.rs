//! Delta computation between the configuration store and the in-memory caches.

#[allow(clippy::module_inception)]
mod changeset;
mod context;
mod engine;

pub use changeset::*;
pub use context::*;
pub use engine::*;
