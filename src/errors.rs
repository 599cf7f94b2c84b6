//! Configuration Synchronization Error Hierarchy
//!
//! Errors are grouped by how far they propagate:
//! - [`DatabaseError`] and [`SyncError`] abort one table's pass for the current cycle
//! - [`RowError`] (and the parse errors it wraps) only skip a single row
//! - [`Error::Fatal`] is reserved for unrecoverable conditions

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Node configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Backing store failures outside of a table pass
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Table synchronization failures
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatabaseError {
    /// Connection lost or store not reachable
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// Statement rejected or failed while executing
    #[error("Query failed: {query}: {reason}")]
    QueryFailed { query: String, reason: String },

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown column {column} in table {table}")]
    UnknownColumn { table: String, column: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Select or fetch failed; the table's cache is left untouched
    #[error("Failed to query table {table}")]
    Query {
        table: &'static str,
        #[source]
        source: DatabaseError,
    },

    /// Declared stage dependencies cannot be ordered
    #[error("Sync stage dependency cycle involving {0}")]
    StageCycle(&'static str),
}

/// Reasons a single result row is skipped for the current cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Macro(#[from] MacroSyntaxError),

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error("Invalid value {value:?} in column {column}")]
    InvalidValue { column: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Column {0} is not part of the projection")]
    MissingColumn(&'static str),

    #[error("Column {0} must not be NULL")]
    NullValue(&'static str),

    #[error("Column {column} holds non-numeric value {value:?}")]
    InvalidNumber { column: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MacroSyntaxError {
    #[error("Not a user macro: {0:?}")]
    NotAMacro(String),

    #[error("Invalid character {found:?} in macro name at offset {offset}")]
    InvalidName { offset: usize, found: char },

    #[error("Empty macro name in {0:?}")]
    EmptyName(String),

    #[error("Unterminated macro starting at offset {0}")]
    Unterminated(usize),

    #[error("Unterminated quoted context starting at offset {0}")]
    UnterminatedQuote(usize),

    #[error("Unexpected character {found:?} after quoted context at offset {offset}")]
    TrailingCharacters { offset: usize, found: char },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    #[error("Empty expression")]
    Empty,

    #[error("Unexpected token {token:?} at offset {offset}")]
    UnexpectedToken { offset: usize, token: String },

    #[error("Unbalanced parentheses")]
    UnbalancedParentheses,

    #[error("Unterminated string literal at offset {0}")]
    UnterminatedString(usize),

    #[error("Missing operand for operator {0}")]
    MissingOperand(&'static str),

    #[error("Serialized expression is corrupt: {0}")]
    Corrupt(String),
}

impl From<bincode::Error> for ExpressionError {
    fn from(e: bincode::Error) -> Self {
        ExpressionError::Corrupt(e.to_string())
    }
}

impl From<base64::DecodeError> for ExpressionError {
    fn from(e: base64::DecodeError) -> Self {
        ExpressionError::Corrupt(e.to_string())
    }
}
