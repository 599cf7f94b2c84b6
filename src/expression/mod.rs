//! Trigger expressions: infix text → postfix token list → bincode → base64.

mod parser;
mod postfix;

pub use parser::*;
pub use postfix::*;
