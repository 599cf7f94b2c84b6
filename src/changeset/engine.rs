//! Changeset Engine
//!
//! Diffs one table's live query result against the cached map for that table:
//! 1. every result row is keyed, marked as seen, decoded and pre-processed
//! 2. unknown keys become `Add`, comparator mismatches `Update`, the rest is
//!    counted as unchanged
//! 3. one pass over the cache emits `Remove` for every key not seen
//!
//! Composite-key relations go through [`ChangesetEngine::compare_links`], which
//! consumes a set of cached pairs instead of a keyed map.

use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;

use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::ChangeTag;
use crate::Changeset;
use crate::ChangesetRow;
use crate::ChangesetStats;
use crate::ConfigDatabase;
use crate::DatabaseError;
use crate::DecodeError;
use crate::LinkRecord;
use crate::LinkTable;
use crate::Query;
use crate::RawRow;
use crate::RowCursor;
use crate::RowError;
use crate::RowReader;
use crate::RowStream;
use crate::SyncContext;
use crate::SyncError;
use crate::SyncMode;

/// Read access to the cached objects of one table, keyed by primary id.
pub trait CachedMap<V> {
    fn lookup(
        &self,
        id: u64,
    ) -> Option<&V>;

    fn for_each_id(
        &self,
        f: &mut dyn FnMut(u64),
    );
}

impl<V> CachedMap<V> for HashMap<u64, V> {
    fn lookup(
        &self,
        id: u64,
    ) -> Option<&V> {
        self.get(&id)
    }

    fn for_each_id(
        &self,
        f: &mut dyn FnMut(u64),
    ) {
        self.keys().for_each(|id| f(*id));
    }
}

/// Per-table description of how rows are read, pre-processed and compared.
pub trait EntitySync {
    /// Typed row as produced by `decode` and `prepare`.
    type Record;
    /// Object held in the cache for this table.
    type Cached;

    /// Defining query: fixed projection and filter.
    fn query(&self) -> Query;

    fn rowid(
        &self,
        row: &RowReader<'_>,
    ) -> Result<u64, DecodeError>;

    fn decode(
        &self,
        row: &RowReader<'_>,
        ctx: &SyncContext,
    ) -> Result<Self::Record, RowError>;

    /// Row pre-processing hook, run before the record is compared or stored.
    ///
    /// Derives the representation the cache keeps (merged defaults, expanded
    /// macros, parsed expressions). An error skips the row for this cycle.
    fn prepare(
        &self,
        record: Self::Record,
        ctx: &SyncContext,
    ) -> Result<Self::Record, RowError> {
        let _ = ctx;
        Ok(record)
    }

    /// True when the cached object already reflects `record`.
    fn matches(
        &self,
        cached: &Self::Cached,
        record: &Self::Record,
        ctx: &SyncContext,
    ) -> bool;
}

pub struct ChangesetEngine<'d> {
    db: &'d dyn ConfigDatabase,
    mode: SyncMode,
}

impl<'d> ChangesetEngine<'d> {
    pub fn new(
        db: &'d dyn ConfigDatabase,
        mode: SyncMode,
    ) -> Self {
        Self { db, mode }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Compares `entity`'s table against `existing`.
    ///
    /// A select failure is returned as [`SyncError::Query`]; nothing is emitted.
    /// In [`SyncMode::Init`] `existing` is ignored and rows stream lazily.
    pub fn compare<'a, E, M>(
        &self,
        entity: &'a E,
        existing: &M,
        ctx: &'a SyncContext,
    ) -> Result<Changeset<'a, E::Record>, SyncError>
    where
        E: EntitySync,
        M: CachedMap<E::Cached> + ?Sized,
    {
        let query = entity.query();
        let table = query.table;
        let cursor = self.db.select(&query).map_err(|source| {
            warn!("[cycle-{}] select on {} failed: {}", ctx.cycle(), table, source);
            SyncError::Query { table, source }
        })?;

        match self.mode {
            SyncMode::Init => Ok(Changeset::streamed(
                table,
                query.columns.len(),
                Box::new(InitStream {
                    entity,
                    ctx,
                    query,
                    cursor,
                    skipped: 0,
                }),
            )),
            SyncMode::Update => diff(entity, existing, ctx, query, cursor),
        }
    }

    /// Reads `entity`'s whole result up front.
    ///
    /// Lets the caller run the query before taking any cache lock and diff the
    /// buffered rows afterwards with [`ChangesetEngine::compare_prefetched`].
    pub fn prefetch<E: EntitySync>(
        &self,
        entity: &E,
        ctx: &SyncContext,
    ) -> Result<Prefetched, SyncError> {
        let query = entity.query();
        let table = query.table;
        let fetch_error = |source| {
            warn!("[cycle-{}] select on {} failed: {}", ctx.cycle(), table, source);
            SyncError::Query { table, source }
        };
        let mut cursor = self.db.select(&query).map_err(fetch_error)?;

        let mut rows = VecDeque::new();
        while let Some(raw) = cursor.fetch().map_err(fetch_error)? {
            rows.push_back(raw);
        }
        trace!("[cycle-{}] {}: prefetched {} rows", ctx.cycle(), table, rows.len());
        Ok(Prefetched { query, rows })
    }

    /// Keyed diff over rows read by [`ChangesetEngine::prefetch`]. Always materialized.
    pub fn compare_prefetched<'a, E, M>(
        &self,
        entity: &E,
        prefetched: Prefetched,
        existing: &M,
        ctx: &SyncContext,
    ) -> Result<Changeset<'a, E::Record>, SyncError>
    where
        E: EntitySync,
        M: CachedMap<E::Cached> + ?Sized,
    {
        let Prefetched { query, rows } = prefetched;
        diff(entity, existing, ctx, query, Box::new(BufferedCursor { rows }))
    }

    /// Composite-key diff: `existing` holds the pairs currently cached.
    ///
    /// Pairs found in the result are taken out of the set, unknown ones are
    /// emitted as `Add`, and whatever is left in the set afterwards as `Remove`.
    pub fn compare_links(
        &self,
        links: &LinkTable,
        mut existing: HashSet<LinkRecord>,
        ctx: &SyncContext,
    ) -> Result<Changeset<'static, LinkRecord>, SyncError> {
        let query = links.query();
        let table = query.table;
        let fetch_error = |source| {
            warn!("[cycle-{}] select on {} failed: {}", ctx.cycle(), table, source);
            SyncError::Query { table, source }
        };
        let mut cursor = self.db.select(&query).map_err(fetch_error)?;

        let mut stats = ChangesetStats::default();
        let mut rows = Vec::new();
        let mut seen = HashSet::new();

        while let Some(raw) = cursor.fetch().map_err(fetch_error)? {
            let row = RowReader::new(query.columns, &raw);
            let pair = match links.decode(&row) {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("[cycle-{}] {}: skipping row: {}", ctx.cycle(), table, e);
                    stats.skipped += 1;
                    continue;
                }
            };

            if !seen.insert(pair) {
                continue;
            }
            if existing.remove(&pair) {
                stats.unchanged += 1;
            } else {
                trace!("[cycle-{}] {}: add {:?}", ctx.cycle(), table, pair);
                stats.added += 1;
                rows.push(ChangesetRow::add(0, pair));
            }
        }

        let mut stale: Vec<LinkRecord> = existing.into_iter().collect();
        stale.sort_unstable();
        for pair in stale {
            trace!("[cycle-{}] {}: remove {:?}", ctx.cycle(), table, pair);
            stats.removed += 1;
            rows.push(ChangesetRow {
                rowid: 0,
                tag: ChangeTag::Remove,
                record: Some(pair),
            });
        }

        debug!("[cycle-{}] {} changeset: {:?}", ctx.cycle(), table, stats);
        Ok(Changeset::materialized(table, query.columns.len(), rows, stats))
    }
}

fn diff<'a, E, M>(
    entity: &E,
    existing: &M,
    ctx: &SyncContext,
    query: Query,
    mut cursor: Box<dyn RowCursor>,
) -> Result<Changeset<'a, E::Record>, SyncError>
where
    E: EntitySync,
    M: CachedMap<E::Cached> + ?Sized,
{
    let table = query.table;
    let mut stats = ChangesetStats::default();
    let mut rows = Vec::new();
    let mut seen = HashSet::new();

    while let Some(raw) = cursor.fetch().map_err(|source| {
        warn!("[cycle-{}] fetch on {} failed: {}", ctx.cycle(), table, source);
        SyncError::Query { table, source }
    })? {
        let row = RowReader::new(query.columns, &raw);
        let rowid = match entity.rowid(&row) {
            Ok(rowid) => rowid,
            Err(e) => {
                warn!("[cycle-{}] {}: skipping row without usable key: {}", ctx.cycle(), table, e);
                stats.skipped += 1;
                continue;
            }
        };
        // A skipped row still counts as present so it is retried, not removed.
        seen.insert(rowid);

        let record = match entity.decode(&row, ctx).and_then(|r| entity.prepare(r, ctx)) {
            Ok(record) => record,
            Err(e) => {
                warn!("[cycle-{}] {}: skipping row {}: {}", ctx.cycle(), table, rowid, e);
                stats.skipped += 1;
                continue;
            }
        };

        let tag = match existing.lookup(rowid) {
            None => ChangeTag::Add,
            Some(cached) if entity.matches(cached, &record, ctx) => ChangeTag::Unchanged,
            Some(_) => ChangeTag::Update,
        };
        stats.count(tag);

        if tag != ChangeTag::Unchanged {
            trace!("[cycle-{}] {}: {} {}", ctx.cycle(), table, tag, rowid);
            rows.push(ChangesetRow {
                rowid,
                tag,
                record: Some(record),
            });
        }
    }

    existing.for_each_id(&mut |rowid| {
        if !seen.contains(&rowid) {
            trace!("[cycle-{}] {}: remove {}", ctx.cycle(), table, rowid);
            stats.removed += 1;
            rows.push(ChangesetRow::remove(rowid));
        }
    });

    debug!("[cycle-{}] {} changeset: {:?}", ctx.cycle(), table, stats);
    Ok(Changeset::materialized(table, query.columns.len(), rows, stats))
}

/// One table's result, read ahead of the diff.
#[derive(Debug)]
pub struct Prefetched {
    query: Query,
    rows: VecDeque<RawRow>,
}

impl Prefetched {
    pub fn table(&self) -> &'static str {
        self.query.table
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

struct BufferedCursor {
    rows: VecDeque<RawRow>,
}

impl RowCursor for BufferedCursor {
    fn fetch(&mut self) -> Result<Option<RawRow>, DatabaseError> {
        Ok(self.rows.pop_front())
    }
}

/// Init-mode row source: decodes straight off the cursor as the caller iterates.
struct InitStream<'a, E> {
    entity: &'a E,
    ctx: &'a SyncContext,
    query: Query,
    cursor: Box<dyn RowCursor>,
    skipped: usize,
}

impl<E: EntitySync> RowStream<E::Record> for InitStream<'_, E> {
    fn next_row(&mut self) -> Result<Option<ChangesetRow<E::Record>>, SyncError> {
        let table = self.query.table;
        loop {
            let Some(raw) = self
                .cursor
                .fetch()
                .map_err(|source| SyncError::Query { table, source })?
            else {
                return Ok(None);
            };

            let row = RowReader::new(self.query.columns, &raw);
            let decoded = self.entity.rowid(&row).map_err(RowError::from).and_then(|rowid| {
                let record = self.entity.decode(&row, self.ctx)?;
                Ok((rowid, self.entity.prepare(record, self.ctx)?))
            });

            match decoded {
                Ok((rowid, record)) => return Ok(Some(ChangesetRow::add(rowid, record))),
                Err(e) => {
                    warn!("[cycle-{}] {}: skipping row: {}", self.ctx.cycle(), table, e);
                    self.skipped += 1;
                }
            }
        }
    }

    fn skipped(&self) -> usize {
        self.skipped
    }
}
