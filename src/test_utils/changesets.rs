use std::sync::Arc;

use crate::macros::parse_user_macro;
use crate::string_pool::StringPool;
use crate::Changeset;
use crate::ChangesetEngine;
use crate::ChangesetRow;
use crate::ChangesetStats;
use crate::ConfigDatabase;
use crate::GlobalMacroSync;
use crate::HostMacroSync;
use crate::MacroCache;
use crate::MacroCacheHandle;
use crate::MacroRecord;
use crate::MacroSource;
use crate::MacroSyncStats;
use crate::MacroValueType;
use crate::SyncContext;
use crate::SyncMode;
use crate::HOST_TEMPLATES;

pub fn macro_record(
    pool: &StringPool,
    macroid: u64,
    hostid: u64,
    text: &str,
    value: &str,
) -> MacroRecord {
    let token = parse_user_macro(text).unwrap();
    MacroRecord {
        macroid,
        hostid,
        name: pool.acquire(&token.name),
        context: token.context.as_deref().map(|c| pool.acquire(c)),
        op: token.op,
        value: pool.acquire(value),
        value_type: MacroValueType::Text,
    }
}

/// A materialized changeset holding exactly `rows`.
pub fn changeset_of<R>(
    table: &'static str,
    rows: Vec<ChangesetRow<R>>,
) -> Changeset<'static, R> {
    let mut stats = ChangesetStats::default();
    for row in &rows {
        stats.count(row.tag);
    }
    Changeset::materialized(table, 0, rows, stats)
}

/// Diffs the three macro tables of `db` against `handle` and publishes the result.
pub fn sync_macros(
    db: &dyn ConfigDatabase,
    handle: &MacroCacheHandle,
    mode: SyncMode,
) -> (Arc<MacroCache>, MacroSyncStats) {
    let ctx = SyncContext::new(1, mode);
    let engine = ChangesetEngine::new(db, mode);
    let snapshot = handle.snapshot();

    let global = engine
        .compare(&GlobalMacroSync, &snapshot.view(MacroSource::Global), &ctx)
        .unwrap();
    let host = engine
        .compare(&HostMacroSync, &snapshot.view(MacroSource::Host), &ctx)
        .unwrap();
    let templates = engine
        .compare_links(&HOST_TEMPLATES, snapshot.host_template_links(), &ctx)
        .unwrap();
    handle.sync(global, host, templates).unwrap()
}
