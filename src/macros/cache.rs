//! Copy-on-write user macro cache.
//!
//! A [`MacroCache`] is an immutable snapshot once published. [`MacroCache::sync`]
//! takes the published `Arc`, and `Arc::make_mut` duplicates the snapshot (one
//! level: id maps of `Arc`s) and then every host it touches, so readers holding
//! the previous snapshot keep seeing it unchanged.
//!
//! Resolution precedence for `{$NAME:context}` seen from a host:
//! 1. context match on the host or its templates (breadth first)
//! 2. context match on the global macros
//! 3. nearest context-less default on the host or its templates
//! 4. global context-less default

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use tracing::trace;

use crate::changeset::CachedMap;
use crate::macros::pick_variant;
use crate::string_pool::StringPool;
use crate::ChangeTag;
use crate::Changeset;
use crate::ChangesetStats;
use crate::LinkRecord;
use crate::MacroKey;
use crate::MacroRecord;
use crate::MacroSource;
use crate::SyncError;
use crate::UserMacro;
use crate::GLOBAL_HOSTID;

/// Macros defined on one host (or template) and the templates it links.
#[derive(Debug, Clone)]
pub struct MacroHost {
    pub hostid: u64,
    /// Sorted, no duplicates.
    pub templateids: Vec<u64>,
    /// Sorted by name, then context with the default first.
    pub macros: Vec<Arc<UserMacro>>,
}

impl MacroHost {
    fn new(hostid: u64) -> Self {
        Self {
            hostid,
            templateids: Vec::new(),
            macros: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.templateids.is_empty() && self.macros.is_empty()
    }

    /// Definitions named `name`, in list order.
    pub fn named(
        &self,
        name: &str,
    ) -> &[Arc<UserMacro>] {
        let start = self.macros.partition_point(|m| m.name.as_str() < name);
        let end = self.macros.partition_point(|m| m.name.as_str() <= name);
        &self.macros[start..end]
    }

    fn lookup(
        &self,
        name: &str,
        context: Option<&str>,
    ) -> (Option<&UserMacro>, Option<&UserMacro>) {
        pick_variant(self.named(name), context)
    }

    fn insert_macro(
        &mut self,
        um: Arc<UserMacro>,
    ) {
        let at = self.macros.partition_point(|m| m.order(&um).is_lt());
        self.macros.insert(at, um);
    }

    fn remove_macro(
        &mut self,
        key: MacroKey,
    ) {
        self.macros.retain(|m| m.key != key);
    }

    fn link_template(
        &mut self,
        templateid: u64,
    ) {
        if let Err(at) = self.templateids.binary_search(&templateid) {
            self.templateids.insert(at, templateid);
        }
    }

    fn unlink_template(
        &mut self,
        templateid: u64,
    ) {
        if let Ok(at) = self.templateids.binary_search(&templateid) {
            self.templateids.remove(at);
        }
    }
}

/// Final counters of the three changesets one macro sync consumed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MacroSyncStats {
    pub global: ChangesetStats,
    pub host: ChangesetStats,
    pub templates: ChangesetStats,
}

/// Published macro snapshot. Cheap to clone: maps hold `Arc`s.
#[derive(Debug, Clone, Default)]
pub struct MacroCache {
    revision: u64,
    hosts: HashMap<u64, Arc<MacroHost>>,
    macros: HashMap<MacroKey, Arc<UserMacro>>,
}

impl MacroCache {
    /// Bumped by every sync that changes something.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn host(
        &self,
        hostid: u64,
    ) -> Option<&Arc<MacroHost>> {
        self.hosts.get(&hostid)
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn macro_count(&self) -> usize {
        self.macros.len()
    }

    pub fn macro_by_key(
        &self,
        key: MacroKey,
    ) -> Option<&Arc<UserMacro>> {
        self.macros.get(&key)
    }

    /// Cached macros of one source table, keyed by that table's macro id.
    pub fn view(
        &self,
        source: MacroSource,
    ) -> MacroView<'_> {
        MacroView { cache: self, source }
    }

    /// Every cached host → template link.
    pub fn host_template_links(&self) -> HashSet<LinkRecord> {
        self.hosts
            .values()
            .flat_map(|host| host.templateids.iter().map(|t| LinkRecord::new(host.hostid, *t)))
            .collect()
    }

    /// Applies the macro and template-link changesets, returning the next snapshot.
    ///
    /// Returns `self` untouched when all three changesets are empty. If a
    /// streamed changeset ends with a cursor failure the partially built
    /// snapshot is dropped and the error returned.
    pub fn sync(
        self: Arc<Self>,
        pool: &StringPool,
        global: Changeset<'_, MacroRecord>,
        host: Changeset<'_, MacroRecord>,
        templates: Changeset<'_, LinkRecord>,
    ) -> Result<Arc<Self>, SyncError> {
        self.sync_with_stats(pool, global, host, templates)
            .map(|(cache, _)| cache)
    }

    /// [`Self::sync`], also returning the final counters of each changeset.
    pub fn sync_with_stats(
        self: Arc<Self>,
        pool: &StringPool,
        mut global: Changeset<'_, MacroRecord>,
        mut host: Changeset<'_, MacroRecord>,
        mut templates: Changeset<'_, LinkRecord>,
    ) -> Result<(Arc<Self>, MacroSyncStats), SyncError> {
        if global.is_empty() && host.is_empty() && templates.is_empty() {
            let stats = MacroSyncStats {
                global: global.finish()?,
                host: host.finish()?,
                templates: templates.finish()?,
            };
            return Ok((self, stats));
        }

        let mut this = self;
        let cache = Arc::make_mut(&mut this);
        let mut touched = HashSet::new();

        for row in global.by_ref() {
            cache.apply_macro(pool, MacroKey::global(row.rowid), row.tag, row.record, &mut touched);
        }
        for row in host.by_ref() {
            cache.apply_macro(pool, MacroKey::host(row.rowid), row.tag, row.record, &mut touched);
        }
        for row in templates.by_ref() {
            let Some(link) = row.record else {
                continue;
            };
            touched.insert(link.left);
            let entry = cache.host_mut(link.left);
            match row.tag {
                ChangeTag::Add | ChangeTag::Update => entry.link_template(link.right),
                ChangeTag::Remove => entry.unlink_template(link.right),
                ChangeTag::Unchanged => {}
            }
        }

        let stats = MacroSyncStats {
            global: global.finish()?,
            host: host.finish()?,
            templates: templates.finish()?,
        };

        for hostid in touched {
            if cache.hosts.get(&hostid).is_some_and(|h| h.is_empty()) {
                trace!("pruning empty macro host {}", hostid);
                cache.hosts.remove(&hostid);
            }
        }
        cache.revision += 1;

        debug!(
            "macro cache revision {}: {} hosts, {} macros",
            cache.revision,
            cache.hosts.len(),
            cache.macros.len()
        );
        Ok((this, stats))
    }

    /// Resolves `name` with `context` as seen from `hostids` (nearest first).
    pub fn resolve(
        &self,
        hostids: &[u64],
        name: &str,
        context: Option<&str>,
    ) -> Option<&UserMacro> {
        let mut visited = HashSet::new();
        let mut level: Vec<u64> = hostids.to_vec();
        let mut host_default = None;

        while !level.is_empty() {
            let mut next = Vec::new();
            for hostid in level {
                if hostid == GLOBAL_HOSTID || !visited.insert(hostid) {
                    continue;
                }
                let Some(host) = self.hosts.get(&hostid) else {
                    continue;
                };

                let (matched, default) = host.lookup(name, context);
                if matched.is_some() {
                    return matched;
                }
                if host_default.is_none() {
                    host_default = default;
                }
                next.extend(host.templateids.iter().copied().filter(|t| !visited.contains(t)));
            }
            level = next;
        }

        let (global_match, global_default) = match self.hosts.get(&GLOBAL_HOSTID) {
            Some(global) => global.lookup(name, context),
            None => (None, None),
        };
        global_match.or(host_default).or(global_default)
    }

    fn host_mut(
        &mut self,
        hostid: u64,
    ) -> &mut MacroHost {
        Arc::make_mut(
            self.hosts
                .entry(hostid)
                .or_insert_with(|| Arc::new(MacroHost::new(hostid))),
        )
    }

    fn apply_macro(
        &mut self,
        pool: &StringPool,
        key: MacroKey,
        tag: ChangeTag,
        record: Option<MacroRecord>,
        touched: &mut HashSet<u64>,
    ) {
        if tag == ChangeTag::Unchanged {
            return;
        }
        if let Some(old) = self.macros.remove(&key) {
            touched.insert(old.hostid);
            self.host_mut(old.hostid).remove_macro(key);
        }

        match (tag, record) {
            (ChangeTag::Add | ChangeTag::Update, Some(record)) => {
                let um = Arc::new(UserMacro::from_record(key, &record, pool));
                trace!("{} macro {:?} {}", tag, key, um.name);
                touched.insert(um.hostid);
                self.host_mut(um.hostid).insert_macro(um.clone());
                self.macros.insert(key, um);
            }
            (ChangeTag::Remove, _) => trace!("remove macro {:?}", key),
            _ => {}
        }
    }
}

/// [`CachedMap`] over the macros of one source table.
pub struct MacroView<'a> {
    cache: &'a MacroCache,
    source: MacroSource,
}

impl CachedMap<Arc<UserMacro>> for MacroView<'_> {
    fn lookup(
        &self,
        id: u64,
    ) -> Option<&Arc<UserMacro>> {
        self.cache.macros.get(&MacroKey {
            source: self.source,
            macroid: id,
        })
    }

    fn for_each_id(
        &self,
        f: &mut dyn FnMut(u64),
    ) {
        self.cache
            .macros
            .keys()
            .filter(|key| key.source == self.source)
            .for_each(|key| f(key.macroid));
    }
}
