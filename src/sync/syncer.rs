//! Synchronization driver.
//!
//! One [`ConfigSyncer`] owns the write side of a [`ConfigCache`]. Each cycle
//! runs every stage in dependency order; the first cycle streams full tables
//! (`Init`), later ones diff against the cache (`Update`). A failed table
//! keeps its cached state and is retried next cycle.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::apply_keyed;
use crate::apply_links;
use crate::metrics::FAILED_TABLE_SYNCS;
use crate::metrics::SKIPPED_ROWS_METRIC;
use crate::metrics::SYNC_DURATION_METRIC;
use crate::metrics::SYNC_ROWS_METRIC;
use crate::storage::schema::GLOBAL_MACRO_TABLE;
use crate::storage::schema::HOST_MACRO_TABLE;
use crate::utils::time::get_now_as_u64;
use crate::ChangeTag;
use crate::ChangesetEngine;
use crate::ConfigCache;
use crate::ConfigDatabase;
use crate::Error;
use crate::GlobalMacroSync;
use crate::HostMacroSync;
use crate::HostSync;
use crate::ItemSync;
use crate::LinkTable;
use crate::MacroSource;
use crate::Result;
use crate::SettingsSync;
use crate::StoredEntity;
use crate::SyncConfig;
use crate::SyncContext;
use crate::SyncError;
use crate::SyncMode;
use crate::SyncReport;
use crate::SyncStage;
use crate::TableReport;
use crate::TriggerSync;
use crate::HOST_GROUPS;
use crate::HOST_TEMPLATES;
use crate::MAINTENANCE_GROUPS;
use crate::MAINTENANCE_HOSTS;

type StageResult = std::result::Result<Vec<TableReport>, SyncError>;

pub struct ConfigSyncer {
    db: Arc<dyn ConfigDatabase>,
    cache: Arc<ConfigCache>,
    config: SyncConfig,
    stages: Vec<SyncStage>,
    cycle: AtomicU64,
    initialized: AtomicBool,
    running: AtomicBool,
}

impl ConfigSyncer {
    /// Fails when the stage dependencies cannot be ordered.
    pub fn new(
        db: Arc<dyn ConfigDatabase>,
        cache: Arc<ConfigCache>,
        config: SyncConfig,
    ) -> Result<Self> {
        let stages = SyncStage::ordered()?;
        debug!("sync stage order: {:?}", stages);
        Ok(Self {
            db,
            cache,
            config,
            stages,
            cycle: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
            running: AtomicBool::new(false),
        })
    }

    pub fn cache(&self) -> &Arc<ConfigCache> {
        &self.cache
    }

    pub fn stages(&self) -> &[SyncStage] {
        &self.stages
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycle.load(Ordering::Acquire)
    }

    /// Runs one full cycle on the calling thread.
    ///
    /// # Panics
    /// When called while another cycle of this syncer is still running.
    pub fn sync_once(&self) -> SyncReport {
        let _guard = CycleGuard::enter(&self.running);

        let cycle = self.cycle.fetch_add(1, Ordering::AcqRel) + 1;
        let mode = if self.initialized.swap(true, Ordering::AcqRel) {
            SyncMode::Update
        } else {
            SyncMode::Init
        };
        let started = Instant::now();
        debug!("[cycle-{}] starting {:?} sync", cycle, mode);

        let mut ctx = SyncContext::new(cycle, mode)
            .with_settings(self.cache.blocking_read(|store| store.settings()))
            .with_macros(self.cache.macros().snapshot());
        let engine = ChangesetEngine::new(self.db.as_ref(), mode);
        let mut report = SyncReport::new(cycle, mode);

        for stage in &self.stages {
            let stage_started = Instant::now();
            let result = self.run_stage(*stage, &engine, &mut ctx);
            let elapsed = stage_started.elapsed();

            SYNC_DURATION_METRIC
                .with_label_values(&[stage.name()])
                .observe(elapsed.as_secs_f64() * 1000.0);
            if elapsed > self.config.slow_sync_warn() {
                warn!("[cycle-{}] stage {} took {:?}", cycle, stage, elapsed);
            }

            match result {
                Ok(tables) => {
                    for table in &tables {
                        record_metrics(table);
                    }
                    report.tables.extend(tables);
                }
                Err(e) => {
                    warn!("[cycle-{}] stage {} failed, cache kept: {}", cycle, stage, e);
                    let table = match &e {
                        SyncError::Query { table, .. } => *table,
                        SyncError::StageCycle(name) => *name,
                    };
                    FAILED_TABLE_SYNCS.with_label_values(&[table]).inc();
                    report.failed.push(table);
                }
            }
        }

        report.elapsed = started.elapsed();
        report.finished_at = get_now_as_u64();
        info!(
            "[cycle-{}] {:?} sync finished in {:?}: {} changes, {} skipped rows, {} failed tables",
            cycle,
            mode,
            report.elapsed,
            report.changes(),
            report.skipped(),
            report.failed.len()
        );
        report
    }

    /// Runs cycles every `interval_in_sec` until `shutdown` fires or its sender is dropped.
    ///
    /// Each cycle runs on the blocking thread pool.
    pub async fn run(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<()>,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("config syncer started, interval {:?}", self.config.interval());

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("config syncer stopped after {} cycles", self.cycles());
                    return Ok(());
                }
                _ = ticker.tick() => {
                    let syncer = self.clone();
                    let report = tokio::task::spawn_blocking(move || syncer.sync_once())
                        .await
                        .map_err(|e| Error::Fatal(format!("sync cycle aborted: {e}")))?;
                    debug!("[cycle-{}] report: {:?}", report.cycle, report);
                }
            }
        }
    }

    fn run_stage(
        &self,
        stage: SyncStage,
        engine: &ChangesetEngine<'_>,
        ctx: &mut SyncContext,
    ) -> StageResult {
        match stage {
            SyncStage::Settings => {
                let tables = self.sync_keyed(engine, ctx, &SettingsSync)?;
                ctx.set_settings(self.cache.blocking_read(|store| store.settings()));
                Ok(tables)
            }
            SyncStage::Hosts => self.sync_keyed(engine, ctx, &HostSync),
            SyncStage::UserMacros => self.sync_macros(engine, ctx),
            SyncStage::Items => self.sync_keyed(engine, ctx, &ItemSync),
            SyncStage::Triggers => self.sync_keyed(engine, ctx, &TriggerSync),
            SyncStage::HostGroups => self.sync_links(engine, ctx, &HOST_GROUPS),
            SyncStage::MaintenanceHosts => self.sync_links(engine, ctx, &MAINTENANCE_HOSTS),
            SyncStage::MaintenanceGroups => self.sync_links(engine, ctx, &MAINTENANCE_GROUPS),
        }
    }

    /// Init mode builds a staging map outside the lock and swaps it in. Update
    /// mode runs the query unlocked; only the diff and the apply hold the store lock.
    fn sync_keyed<E: StoredEntity>(
        &self,
        engine: &ChangesetEngine<'_>,
        ctx: &SyncContext,
        entity: &E,
    ) -> StageResult {
        let pool = self.cache.strings();

        let (table, stats) = match engine.mode() {
            SyncMode::Init => {
                let changeset = engine.compare(entity, &HashMap::<u64, E::Cached>::new(), ctx)?;
                let table = changeset.table();
                let mut staged = HashMap::new();
                let stats = apply_keyed::<E>(&mut staged, changeset, pool)?;
                self.cache.blocking_write(|store| *E::table_mut(store) = staged);
                (table, stats)
            }
            SyncMode::Update => {
                let prefetched = engine.prefetch(entity, ctx)?;
                let changeset = self.cache.blocking_read(|store| {
                    engine.compare_prefetched(entity, prefetched, E::table(store), ctx)
                })?;
                let table = changeset.table();
                let stats = if changeset.stats().changes() == 0 {
                    changeset.finish()?
                } else {
                    self.cache
                        .blocking_write(|store| apply_keyed::<E>(E::table_mut(store), changeset, pool))?
                };
                (table, stats)
            }
        };

        Ok(vec![TableReport { table, stats }])
    }

    fn sync_links(
        &self,
        engine: &ChangesetEngine<'_>,
        ctx: &SyncContext,
        links: &LinkTable,
    ) -> StageResult {
        let stats = match engine.mode() {
            SyncMode::Init => {
                let changeset = engine.compare_links(links, HashSet::new(), ctx)?;
                let mut staged = HashSet::new();
                let stats = apply_links(&mut staged, changeset)?;
                self.cache.blocking_write(|store| store.replace_links(links, staged));
                stats
            }
            SyncMode::Update => {
                let existing = self
                    .cache
                    .blocking_read(|store| store.links(links).cloned().unwrap_or_default());
                let changeset = engine.compare_links(links, existing, ctx)?;
                if changeset.stats().changes() == 0 {
                    changeset.finish()?
                } else {
                    self.cache
                        .blocking_write(|store| apply_links(store.links_mut(links), changeset))?
                }
            }
        };

        Ok(vec![TableReport {
            table: links.table,
            stats,
        }])
    }

    /// All three macro tables are diffed before anything is applied, so a
    /// failure in any of them leaves the published snapshot as it was.
    fn sync_macros(
        &self,
        engine: &ChangesetEngine<'_>,
        ctx: &mut SyncContext,
    ) -> StageResult {
        let snapshot = self.cache.macros().snapshot();
        let (next, stats) = {
            let ctx: &SyncContext = ctx;
            let global = engine.compare(&GlobalMacroSync, &snapshot.view(MacroSource::Global), ctx)?;
            let host = engine.compare(&HostMacroSync, &snapshot.view(MacroSource::Host), ctx)?;
            let templates = engine.compare_links(&HOST_TEMPLATES, snapshot.host_template_links(), ctx)?;
            drop(snapshot);
            self.cache.macros().sync(global, host, templates)?
        };
        ctx.set_macros(next);

        Ok(vec![
            TableReport {
                table: GLOBAL_MACRO_TABLE,
                stats: stats.global,
            },
            TableReport {
                table: HOST_MACRO_TABLE,
                stats: stats.host,
            },
            TableReport {
                table: HOST_TEMPLATES.table,
                stats: stats.templates,
            },
        ])
    }
}

fn record_metrics(report: &TableReport) {
    let stats = report.stats;
    for (tag, count) in [
        (ChangeTag::Add, stats.added),
        (ChangeTag::Update, stats.updated),
        (ChangeTag::Remove, stats.removed),
    ] {
        if count > 0 {
            SYNC_ROWS_METRIC
                .with_label_values(&[report.table, tag.as_str()])
                .inc_by(count as u64);
        }
    }
    if stats.skipped > 0 {
        SKIPPED_ROWS_METRIC
            .with_label_values(&[report.table])
            .inc_by(stats.skipped as u64);
    }
}

/// Marks a cycle as running for as long as it lives.
struct CycleGuard<'a>(&'a AtomicBool);

impl<'a> CycleGuard<'a> {
    fn enter(running: &'a AtomicBool) -> Self {
        if running.swap(true, Ordering::AcqRel) {
            error!("sync cycle entered while another one is running");
            panic!("re-entrant config sync");
        }
        Self(running)
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
