use std::fmt;

use crate::SyncError;

/// How a changeset produces its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Cache is empty: every row is an `Add`, streamed straight off the cursor.
    Init,
    /// Rows are diffed against the cache and materialized before use.
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeTag {
    Add,
    Update,
    Remove,
    /// Row matches the cache. Counted, never emitted.
    Unchanged,
}

impl ChangeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeTag::Add => "add",
            ChangeTag::Update => "update",
            ChangeTag::Remove => "remove",
            ChangeTag::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for ChangeTag {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One emitted change.
///
/// Keyed entities carry their primary key in `rowid` and no record on
/// `Remove`. Composite-key relations use `rowid == 0` and always carry the
/// key pair as their record.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangesetRow<R> {
    pub rowid: u64,
    pub tag: ChangeTag,
    pub record: Option<R>,
}

impl<R> ChangesetRow<R> {
    pub fn add(
        rowid: u64,
        record: R,
    ) -> Self {
        Self {
            rowid,
            tag: ChangeTag::Add,
            record: Some(record),
        }
    }

    pub fn update(
        rowid: u64,
        record: R,
    ) -> Self {
        Self {
            rowid,
            tag: ChangeTag::Update,
            record: Some(record),
        }
    }

    pub fn remove(rowid: u64) -> Self {
        Self {
            rowid,
            tag: ChangeTag::Remove,
            record: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChangesetStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Rows dropped for this cycle (malformed macro, undecodable column).
    pub skipped: usize,
}

impl ChangesetStats {
    /// Number of rows that change the cache.
    pub fn changes(&self) -> usize {
        self.added + self.updated + self.removed
    }

    pub(crate) fn count(
        &mut self,
        tag: ChangeTag,
    ) {
        match tag {
            ChangeTag::Add => self.added += 1,
            ChangeTag::Update => self.updated += 1,
            ChangeTag::Remove => self.removed += 1,
            ChangeTag::Unchanged => self.unchanged += 1,
        }
    }
}

/// Lazily produced rows for [`SyncMode::Init`].
pub(crate) trait RowStream<R> {
    fn next_row(&mut self) -> Result<Option<ChangesetRow<R>>, SyncError>;

    /// Rows dropped so far.
    fn skipped(&self) -> usize;
}

enum RowSource<'a, R> {
    Streamed(Box<dyn RowStream<R> + 'a>),
    Materialized(std::vec::IntoIter<ChangesetRow<R>>),
}

/// Result of comparing one table against its cache.
///
/// Consumed once through [`Iterator`]. In [`SyncMode::Init`] a cursor failure
/// while streaming ends the iteration early; [`Changeset::finish`] reports it,
/// and callers must discard whatever they built from the partial stream.
pub struct Changeset<'a, R> {
    table: &'static str,
    mode: SyncMode,
    width: usize,
    stats: ChangesetStats,
    source: RowSource<'a, R>,
    peeked: Option<ChangesetRow<R>>,
    error: Option<SyncError>,
}

impl<'a, R> Changeset<'a, R> {
    pub(crate) fn materialized(
        table: &'static str,
        width: usize,
        rows: Vec<ChangesetRow<R>>,
        stats: ChangesetStats,
    ) -> Self {
        Self {
            table,
            mode: SyncMode::Update,
            width,
            stats,
            source: RowSource::Materialized(rows.into_iter()),
            peeked: None,
            error: None,
        }
    }

    pub(crate) fn streamed(
        table: &'static str,
        width: usize,
        stream: Box<dyn RowStream<R> + 'a>,
    ) -> Self {
        Self {
            table,
            mode: SyncMode::Init,
            width,
            stats: ChangesetStats::default(),
            source: RowSource::Streamed(stream),
            peeked: None,
            error: None,
        }
    }

    /// An empty changeset, used when a stage has nothing to diff.
    pub fn empty(table: &'static str) -> Self {
        Self::materialized(table, 0, Vec::new(), ChangesetStats::default())
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Column count of the table's projection.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Counters so far. Final for materialized changesets; grows while a
    /// streamed changeset is iterated.
    pub fn stats(&self) -> ChangesetStats {
        let mut stats = self.stats;
        if let RowSource::Streamed(stream) = &self.source {
            stats.skipped = stream.skipped();
        }
        stats
    }

    /// True when no row will be emitted. May pull one row from a streamed source.
    pub fn is_empty(&mut self) -> bool {
        if self.peeked.is_some() {
            return false;
        }
        if let RowSource::Materialized(rows) = &self.source {
            return rows.as_slice().is_empty();
        }
        self.peeked = self.pull();
        self.peeked.is_none()
    }

    /// Ends the changeset, surfacing a failure that cut a streamed changeset short.
    pub fn finish(self) -> Result<ChangesetStats, SyncError> {
        let stats = self.stats();
        match self.error {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    fn pull(&mut self) -> Option<ChangesetRow<R>> {
        match &mut self.source {
            RowSource::Materialized(rows) => rows.next(),
            RowSource::Streamed(stream) => {
                if self.error.is_some() {
                    return None;
                }
                match stream.next_row() {
                    Ok(Some(row)) => {
                        self.stats.count(row.tag);
                        Some(row)
                    }
                    Ok(None) => None,
                    Err(e) => {
                        self.error = Some(e);
                        None
                    }
                }
            }
        }
    }
}

impl<R> Iterator for Changeset<'_, R> {
    type Item = ChangesetRow<R>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(row) = self.peeked.take() {
            return Some(row);
        }
        self.pull()
    }
}

impl<R> fmt::Debug for Changeset<'_, R> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Changeset")
            .field("table", &self.table)
            .field("mode", &self.mode)
            .field("width", &self.width)
            .field("stats", &self.stats())
            .finish()
    }
}
