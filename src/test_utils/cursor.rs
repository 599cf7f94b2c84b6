use std::collections::VecDeque;

use crate::DatabaseError;
use crate::RawRow;
use crate::RowCursor;

/// Yields `rows`, then fails instead of reporting the end of the result.
pub struct FailingCursor {
    rows: VecDeque<RawRow>,
}

impl FailingCursor {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows: rows.into() }
    }
}

impl RowCursor for FailingCursor {
    fn fetch(&mut self) -> Result<Option<RawRow>, DatabaseError> {
        match self.rows.pop_front() {
            Some(row) => Ok(Some(row)),
            None => Err(DatabaseError::Unavailable("connection reset".to_string())),
        }
    }
}

/// Text row with every value present.
pub fn raw_row(values: &[&str]) -> RawRow {
    values.iter().map(|v| Some(v.to_string())).collect()
}
