mod report;
mod stage;
mod syncer;

pub use report::*;
pub use stage::*;
pub use syncer::*;

#[cfg(test)]
mod syncer_test;
