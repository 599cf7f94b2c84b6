//! Fixtures shared by the unit tests: database seeding, hand-built
//! changesets and scripted cursors.
mod changesets;
mod cursor;
mod seed;

pub use changesets::*;
pub use cursor::*;
pub use seed::*;
