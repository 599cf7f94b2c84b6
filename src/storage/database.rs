//! Database access boundary
//!
//! The synchronizer only needs blocking reads:
//! - [`ConfigDatabase::select`] runs a [`Query`] and hands back a cursor
//! - [`RowCursor::fetch`] yields one row of nullable text columns at a time
//! - dropping the cursor frees it
//!
//! Rows are positional on the wire. [`RowReader`] maps them back to the
//! query's column names so entity decoders never index by offset.

use std::fmt;
use std::str::FromStr;

#[cfg(test)]
use mockall::automock;

use crate::string_pool::PooledStr;
use crate::string_pool::StringPool;
use crate::DatabaseError;
use crate::DecodeError;

/// One result row: nullable text columns in projection order.
pub type RawRow = Vec<Option<String>>;

/// Row filter understood by every adaptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(&'static str, String),
    NotEq(&'static str, String),
    In(&'static str, Vec<String>),
    And(Vec<Filter>),
}

impl Filter {
    /// Evaluates the filter against a row; `lookup` returns a column's value.
    /// NULL never satisfies a comparison.
    pub fn matches<'a>(
        &self,
        lookup: &impl Fn(&str) -> Option<&'a str>,
    ) -> bool {
        match self {
            Filter::Eq(column, value) => lookup(column) == Some(value.as_str()),
            Filter::NotEq(column, value) => lookup(column).is_some_and(|v| v != value),
            Filter::In(column, values) => {
                lookup(column).is_some_and(|v| values.iter().any(|candidate| candidate == v))
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(lookup)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Filter::Eq(column, value) => write!(f, "{column}='{}'", escape(value)),
            Filter::NotEq(column, value) => write!(f, "{column}<>'{}'", escape(value)),
            Filter::In(column, values) => {
                let list: Vec<String> = values.iter().map(|v| format!("'{}'", escape(v))).collect();
                write!(f, "{column} in ({})", list.join(","))
            }
            Filter::And(filters) => {
                let parts: Vec<String> = filters.iter().map(|f| f.to_string()).collect();
                write!(f, "{}", parts.join(" and "))
            }
        }
    }
}

fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// Fixed projection over one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub filter: Option<Filter>,
}

impl Query {
    pub fn new(
        table: &'static str,
        columns: &'static [&'static str],
    ) -> Self {
        Self {
            table,
            columns,
            filter: None,
        }
    }

    pub fn with_filter(
        mut self,
        filter: Filter,
    ) -> Self {
        self.filter = Some(filter);
        self
    }

    /// SQL text for adaptors backed by a real SQL driver.
    pub fn to_sql(&self) -> String {
        let mut sql = format!("select {} from {}", self.columns.join(","), self.table);
        if let Some(filter) = &self.filter {
            sql.push_str(" where ");
            sql.push_str(&filter.to_string());
        }
        sql
    }
}

#[cfg_attr(test, automock)]
pub trait ConfigDatabase: Send + Sync + 'static {
    fn select(
        &self,
        query: &Query,
    ) -> std::result::Result<Box<dyn RowCursor>, DatabaseError>;
}

pub trait RowCursor: Send {
    /// Next row, `None` once the result is exhausted.
    fn fetch(&mut self) -> std::result::Result<Option<RawRow>, DatabaseError>;
}

/// Named, typed access to one positional row.
#[derive(Clone, Copy)]
pub struct RowReader<'a> {
    columns: &'a [&'static str],
    values: &'a [Option<String>],
}

impl<'a> RowReader<'a> {
    pub fn new(
        columns: &'a [&'static str],
        values: &'a [Option<String>],
    ) -> Self {
        Self { columns, values }
    }

    /// Number of columns in the row.
    pub fn width(&self) -> usize {
        self.values.len()
    }

    pub fn raw(
        &self,
        column: &'static str,
    ) -> std::result::Result<Option<&'a str>, DecodeError> {
        let offset = self
            .columns
            .iter()
            .position(|c| *c == column)
            .ok_or(DecodeError::MissingColumn(column))?;
        Ok(self.values.get(offset).and_then(|v| v.as_deref()))
    }

    /// Non-null unsigned identifier.
    pub fn id(
        &self,
        column: &'static str,
    ) -> std::result::Result<u64, DecodeError> {
        self.number(column)
    }

    /// Optional identifier; NULL reads as 0.
    pub fn opt_id(
        &self,
        column: &'static str,
    ) -> std::result::Result<u64, DecodeError> {
        match self.raw(column)? {
            None => Ok(0),
            Some(_) => self.number(column),
        }
    }

    pub fn number<T: FromStr>(
        &self,
        column: &'static str,
    ) -> std::result::Result<T, DecodeError> {
        let value = self.raw(column)?.ok_or(DecodeError::NullValue(column))?;
        value.trim().parse().map_err(|_| DecodeError::InvalidNumber {
            column,
            value: value.to_string(),
        })
    }

    /// Text column interned into `pool`; NULL reads as the empty string.
    pub fn text(
        &self,
        column: &'static str,
        pool: &StringPool,
    ) -> std::result::Result<PooledStr, DecodeError> {
        Ok(pool.acquire(self.raw(column)?.unwrap_or_default()))
    }
}
