//! Mutable user macro index.
//!
//! Same resolution rules as [`crate::MacroCache`], without snapshots: the index
//! is changed in place and callers serialize access themselves.

use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use crate::macros::pick_variant;
use crate::string_pool::PooledStr;
use crate::string_pool::StringPool;
use crate::ChangeTag;
use crate::Changeset;
use crate::ChangesetRow;
use crate::LinkRecord;
use crate::MacroKey;
use crate::MacroRecord;
use crate::SyncError;
use crate::UserMacro;
use crate::GLOBAL_HOSTID;

#[derive(Debug, Default)]
pub struct UserMacroIndex {
    /// owner id → name → context variants, default first
    owners: HashMap<u64, HashMap<PooledStr, Vec<Arc<UserMacro>>>>,
    templates: HashMap<u64, Vec<u64>>,
    keys: HashMap<MacroKey, Arc<UserMacro>>,
}

impl UserMacroIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Templates linked to `hostid`, in link order.
    pub fn templates(
        &self,
        hostid: u64,
    ) -> &[u64] {
        self.templates.get(&hostid).map(Vec::as_slice).unwrap_or_default()
    }

    /// Applies the three changesets; nothing is changed unless all of them finish cleanly.
    pub fn sync(
        &mut self,
        pool: &StringPool,
        global: Changeset<'_, MacroRecord>,
        host: Changeset<'_, MacroRecord>,
        templates: Changeset<'_, LinkRecord>,
    ) -> Result<usize, SyncError> {
        let (global, host, templates) = (collect(global)?, collect(host)?, collect(templates)?);
        let changes = global.len() + host.len() + templates.len();

        for row in global {
            self.apply_macro(pool, MacroKey::global(row.rowid), row);
        }
        for row in host {
            self.apply_macro(pool, MacroKey::host(row.rowid), row);
        }
        for row in templates {
            let Some(link) = row.record else {
                continue;
            };
            let linked = self.templates.entry(link.left).or_default();
            match row.tag {
                ChangeTag::Add | ChangeTag::Update if !linked.contains(&link.right) => linked.push(link.right),
                ChangeTag::Remove => linked.retain(|t| *t != link.right),
                _ => {}
            }
            if linked.is_empty() {
                self.templates.remove(&link.left);
            }
        }

        debug!("macro index applied {} changes, {} macros", changes, self.keys.len());
        Ok(changes)
    }

    pub fn resolve(
        &self,
        hostids: &[u64],
        name: &str,
        context: Option<&str>,
    ) -> Option<&UserMacro> {
        let mut queue: VecDeque<u64> = hostids.iter().copied().collect();
        let mut visited = HashSet::new();
        let mut host_default = None;

        while let Some(hostid) = queue.pop_front() {
            if hostid == GLOBAL_HOSTID || !visited.insert(hostid) {
                continue;
            }
            let (matched, default) = self.variants(hostid, name, context);
            if matched.is_some() {
                return matched;
            }
            host_default = host_default.or(default);
            queue.extend(self.templates(hostid));
        }

        let (global_match, global_default) = self.variants(GLOBAL_HOSTID, name, context);
        global_match.or(host_default).or(global_default)
    }

    fn variants(
        &self,
        owner: u64,
        name: &str,
        context: Option<&str>,
    ) -> (Option<&UserMacro>, Option<&UserMacro>) {
        match self.owners.get(&owner).and_then(|names| names.get(name)) {
            Some(variants) => pick_variant(variants, context),
            None => (None, None),
        }
    }

    fn apply_macro(
        &mut self,
        pool: &StringPool,
        key: MacroKey,
        row: ChangesetRow<MacroRecord>,
    ) {
        if row.tag == ChangeTag::Unchanged {
            return;
        }
        if let Some(old) = self.keys.remove(&key) {
            if let Some(names) = self.owners.get_mut(&old.hostid) {
                if let Some(variants) = names.get_mut(old.name.as_str()) {
                    variants.retain(|m| m.key != key);
                    if variants.is_empty() {
                        names.remove(old.name.as_str());
                    }
                }
                if names.is_empty() {
                    self.owners.remove(&old.hostid);
                }
            }
        }

        let (ChangeTag::Add | ChangeTag::Update, Some(record)) = (row.tag, row.record) else {
            return;
        };
        let um = Arc::new(UserMacro::from_record(key, &record, pool));
        let variants = self
            .owners
            .entry(um.hostid)
            .or_default()
            .entry(um.name.clone())
            .or_default();
        let at = variants.partition_point(|m| m.order(&um).is_lt());
        variants.insert(at, um.clone());
        self.keys.insert(key, um);
    }
}

/// Drains `changeset`, surfacing a failure that cut it short.
fn collect<R>(mut changeset: Changeset<'_, R>) -> Result<Vec<ChangesetRow<R>>, SyncError> {
    let rows: Vec<_> = changeset.by_ref().collect();
    changeset.finish()?;
    Ok(rows)
}
