use std::sync::Arc;

use dashmap::DashSet;
use tracing::trace;

use crate::macros::expand_user_macros;
use crate::macros::has_user_macros;
use crate::string_pool::StringPool;
use crate::GlobalSettings;
use crate::MacroCache;
use crate::MacroSyntaxError;
use crate::SyncMode;

/// State shared by every comparator and pre-processing hook during one cycle.
///
/// Owns the cycle-scoped string pool, the housekeeping settings and macro
/// snapshot the hooks derive values from, and the per-cycle "refresh all
/// items of this host" marks. Dropped at the end of the cycle.
pub struct SyncContext {
    cycle: u64,
    mode: SyncMode,
    pool: StringPool,
    settings: GlobalSettings,
    macros: Arc<MacroCache>,
    refresh_items: DashSet<u64>,
}

impl SyncContext {
    pub fn new(
        cycle: u64,
        mode: SyncMode,
    ) -> Self {
        Self {
            cycle,
            mode,
            pool: StringPool::new("sync-cycle"),
            settings: GlobalSettings::default(),
            macros: Arc::new(MacroCache::default()),
            refresh_items: DashSet::new(),
        }
    }

    pub fn with_settings(
        mut self,
        settings: GlobalSettings,
    ) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_macros(
        mut self,
        macros: Arc<MacroCache>,
    ) -> Self {
        self.macros = macros;
        self
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Cycle-scoped pool for changeset text.
    pub fn pool(&self) -> &StringPool {
        &self.pool
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    pub(crate) fn set_settings(
        &mut self,
        settings: GlobalSettings,
    ) {
        self.settings = settings;
    }

    /// Macro snapshot the hooks resolve against.
    pub fn macros(&self) -> &Arc<MacroCache> {
        &self.macros
    }

    pub(crate) fn set_macros(
        &mut self,
        macros: Arc<MacroCache>,
    ) {
        self.macros = macros;
    }

    /// Forces every item of `hostid` to compare as changed for the rest of the cycle.
    pub fn mark_items_refresh(
        &self,
        hostid: u64,
    ) {
        trace!("[cycle-{}] host {} items marked for full refresh", self.cycle, hostid);
        self.refresh_items.insert(hostid);
    }

    pub fn items_need_refresh(
        &self,
        hostid: u64,
    ) -> bool {
        self.refresh_items.contains(&hostid)
    }

    /// Expands user macros in `text` as seen from `hostid`.
    pub fn expand_macros(
        &self,
        hostid: u64,
        text: &str,
    ) -> Result<String, MacroSyntaxError> {
        if !has_user_macros(text) {
            return Ok(text.to_string());
        }
        let macros = &self.macros;
        expand_user_macros(text, |token| {
            macros
                .resolve(&[hostid], &token.name, token.context.as_deref())
                .map(|m| m.value.to_string())
        })
    }
}
