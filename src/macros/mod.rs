mod cache;
mod handle;
mod legacy_index;
mod syntax;
mod user_macro;

pub use cache::*;
pub use handle::*;
pub use legacy_index::*;
pub use syntax::*;
pub use user_macro::*;
