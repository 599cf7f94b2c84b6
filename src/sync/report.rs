use std::time::Duration;

use crate::ChangesetStats;
use crate::SyncMode;

/// Outcome of one table within a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: &'static str,
    pub stats: ChangesetStats,
}

/// Summary of one sync cycle.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub cycle: u64,
    pub mode: SyncMode,
    pub tables: Vec<TableReport>,
    /// Tables left untouched this cycle because their query failed.
    pub failed: Vec<&'static str>,
    pub elapsed: Duration,
    /// Unix time in seconds at which the cycle ended.
    pub finished_at: u64,
}

impl SyncReport {
    pub(crate) fn new(
        cycle: u64,
        mode: SyncMode,
    ) -> Self {
        Self {
            cycle,
            mode,
            tables: Vec::new(),
            failed: Vec::new(),
            elapsed: Duration::ZERO,
            finished_at: 0,
        }
    }

    pub fn stats(
        &self,
        table: &str,
    ) -> Option<ChangesetStats> {
        self.tables.iter().find(|t| t.table == table).map(|t| t.stats)
    }

    /// Rows that changed the cache, over all tables.
    pub fn changes(&self) -> usize {
        self.tables.iter().map(|t| t.stats.changes()).sum()
    }

    pub fn skipped(&self) -> usize {
        self.tables.iter().map(|t| t.stats.skipped).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
