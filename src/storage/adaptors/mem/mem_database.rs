use std::collections::HashMap;
use std::collections::HashSet;

use parking_lot::RwLock;
use tracing::debug;
use tracing::trace;

use crate::storage::schema::TABLES;
use crate::ConfigDatabase;
use crate::DatabaseError;
use crate::Query;
use crate::RawRow;
use crate::RowCursor;

#[derive(Debug, Clone)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<RawRow>,
}

impl MemoryTable {
    fn offset(
        &self,
        table: &str,
        column: &str,
    ) -> Result<usize, DatabaseError> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| DatabaseError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
    }
}

/// In-memory configuration store.
///
/// Stands in for the relational backend in tests and embedded setups. Every
/// `select` copies the matching rows, so a cursor keeps reading a stable
/// result even while the tables are being edited.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: RwLock<HashMap<String, MemoryTable>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates every table the synchronizer reads, all empty.
    pub fn with_config_schema() -> Self {
        let db = Self::new();
        for (table, columns) in TABLES {
            db.create_table(table, columns);
        }
        db
    }

    pub fn create_table(
        &self,
        table: &str,
        columns: &[&str],
    ) {
        self.tables.write().insert(
            table.to_string(),
            MemoryTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows: Vec::new(),
            },
        );
    }

    /// Inserts a row given as `(column, value)` pairs; omitted columns are NULL.
    pub fn insert(
        &self,
        table: &str,
        values: &[(&str, &str)],
    ) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| DatabaseError::UnknownTable(table.to_string()))?;

        let mut row: RawRow = vec![None; t.columns.len()];
        for (column, value) in values {
            let offset = t.offset(table, column)?;
            row[offset] = Some(value.to_string());
        }
        t.rows.push(row);
        Ok(())
    }

    /// Sets `column` on every row whose `key_column` equals `key`. Returns the rows touched.
    pub fn update(
        &self,
        table: &str,
        key_column: &str,
        key: &str,
        column: &str,
        value: Option<&str>,
    ) -> Result<usize, DatabaseError> {
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| DatabaseError::UnknownTable(table.to_string()))?;
        let key_offset = t.offset(table, key_column)?;
        let offset = t.offset(table, column)?;

        let mut touched = 0;
        for row in t.rows.iter_mut().filter(|row| row[key_offset].as_deref() == Some(key)) {
            row[offset] = value.map(str::to_string);
            touched += 1;
        }
        Ok(touched)
    }

    /// Deletes every row whose `column` equals `value`. Returns the rows removed.
    pub fn delete(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<usize, DatabaseError> {
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| DatabaseError::UnknownTable(table.to_string()))?;
        let offset = t.offset(table, column)?;

        let before = t.rows.len();
        t.rows.retain(|row| row[offset].as_deref() != Some(value));
        Ok(before - t.rows.len())
    }

    /// Makes every `select` on `table` fail until cleared.
    pub fn set_failing(
        &self,
        table: &str,
        failing: bool,
    ) {
        let mut set = self.failing.write();
        if failing {
            set.insert(table.to_string());
        } else {
            set.remove(table);
        }
    }

    pub fn row_count(
        &self,
        table: &str,
    ) -> usize {
        self.tables.read().get(table).map(|t| t.rows.len()).unwrap_or(0)
    }
}

impl ConfigDatabase for MemoryDatabase {
    fn select(
        &self,
        query: &Query,
    ) -> Result<Box<dyn RowCursor>, DatabaseError> {
        if self.failing.read().contains(query.table) {
            return Err(DatabaseError::QueryFailed {
                query: query.to_sql(),
                reason: "table marked as failing".to_string(),
            });
        }

        let tables = self.tables.read();
        let t = tables
            .get(query.table)
            .ok_or_else(|| DatabaseError::UnknownTable(query.table.to_string()))?;

        let projection = query
            .columns
            .iter()
            .map(|column| t.offset(query.table, column))
            .collect::<Result<Vec<_>, _>>()?;

        let mut result = Vec::new();
        for row in &t.rows {
            let lookup = |name: &str| {
                t.columns.iter().position(|c| c == name).and_then(|offset| row[offset].as_deref())
            };
            if let Some(filter) = &query.filter {
                if !filter.matches(&lookup) {
                    continue;
                }
            }
            result.push(projection.iter().map(|offset| row[*offset].clone()).collect());
        }

        debug!("select `{}` returned {} rows", query.to_sql(), result.len());
        Ok(Box::new(MemoryCursor {
            rows: result.into_iter(),
        }))
    }
}

struct MemoryCursor {
    rows: std::vec::IntoIter<RawRow>,
}

impl RowCursor for MemoryCursor {
    fn fetch(&mut self) -> Result<Option<RawRow>, DatabaseError> {
        let row = self.rows.next();
        trace!("fetch: {:?}", row);
        Ok(row)
    }
}
