use std::collections::HashMap;
use std::collections::HashSet;

use tracing::trace;

use crate::string_pool::StringPool;
use crate::ChangeTag;
use crate::Changeset;
use crate::ChangesetStats;
use crate::EntitySync;
use crate::GlobalSettings;
use crate::Host;
use crate::HostSync;
use crate::Item;
use crate::ItemSync;
use crate::LinkRecord;
use crate::LinkTable;
use crate::Rehome;
use crate::SettingsSync;
use crate::SyncError;
use crate::Trigger;
use crate::TriggerSync;

/// Cached configuration maps, one per synchronized table.
#[derive(Debug, Default)]
pub struct ConfigStore {
    settings: HashMap<u64, GlobalSettings>,
    hosts: HashMap<u64, Host>,
    items: HashMap<u64, Item>,
    triggers: HashMap<u64, Trigger>,
    links: HashMap<&'static str, HashSet<LinkRecord>>,
}

impl ConfigStore {
    /// Housekeeping settings; defaults until the `config` row has been read.
    pub fn settings(&self) -> GlobalSettings {
        self.settings
            .values()
            .min_by_key(|s| s.configid)
            .copied()
            .unwrap_or_default()
    }

    pub fn host(
        &self,
        hostid: u64,
    ) -> Option<&Host> {
        self.hosts.get(&hostid)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    pub fn item(
        &self,
        itemid: u64,
    ) -> Option<&Item> {
        self.items.get(&itemid)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn host_items(
        &self,
        hostid: u64,
    ) -> impl Iterator<Item = &Item> {
        self.items.values().filter(move |item| item.hostid == hostid)
    }

    pub fn trigger(
        &self,
        triggerid: u64,
    ) -> Option<&Trigger> {
        self.triggers.get(&triggerid)
    }

    pub fn triggers(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.values()
    }

    /// Cached pairs of a relation table.
    pub fn links(
        &self,
        table: &LinkTable,
    ) -> Option<&HashSet<LinkRecord>> {
        self.links.get(table.table)
    }

    /// Right-hand ids linked to `left`, sorted.
    pub fn linked(
        &self,
        table: &LinkTable,
        left: u64,
    ) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .links(table)
            .into_iter()
            .flatten()
            .filter(|link| link.left == left)
            .map(|link| link.right)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn links_mut(
        &mut self,
        table: &LinkTable,
    ) -> &mut HashSet<LinkRecord> {
        self.links.entry(table.table).or_default()
    }

    pub(crate) fn replace_links(
        &mut self,
        table: &LinkTable,
        links: HashSet<LinkRecord>,
    ) {
        self.links.insert(table.table, links);
    }
}

/// An entity cached in one [`ConfigStore`] map.
pub trait StoredEntity: EntitySync {
    fn table(store: &ConfigStore) -> &HashMap<u64, Self::Cached>;

    fn table_mut(store: &mut ConfigStore) -> &mut HashMap<u64, Self::Cached>;

    /// Cached form of a changeset record, its text moved into `pool`.
    fn to_cached(
        record: Self::Record,
        pool: &StringPool,
    ) -> Self::Cached;
}

macro_rules! stored_entity {
    ($entity:ty, $field:ident) => {
        impl StoredEntity for $entity {
            fn table(store: &ConfigStore) -> &HashMap<u64, Self::Cached> {
                &store.$field
            }

            fn table_mut(store: &mut ConfigStore) -> &mut HashMap<u64, Self::Cached> {
                &mut store.$field
            }

            fn to_cached(
                record: Self::Record,
                pool: &StringPool,
            ) -> Self::Cached {
                record.rehome(pool)
            }
        }
    };
}

stored_entity!(SettingsSync, settings);
stored_entity!(HostSync, hosts);
stored_entity!(ItemSync, items);
stored_entity!(TriggerSync, triggers);

/// Applies a keyed changeset to `map`.
///
/// For streamed changesets the map must be a staging map: rows already
/// applied are not rolled back if the stream fails.
pub fn apply_keyed<E: StoredEntity>(
    map: &mut HashMap<u64, E::Cached>,
    mut changeset: Changeset<'_, E::Record>,
    pool: &StringPool,
) -> Result<ChangesetStats, SyncError> {
    let table = changeset.table();
    for row in changeset.by_ref() {
        match (row.tag, row.record) {
            (ChangeTag::Add | ChangeTag::Update, Some(record)) => {
                map.insert(row.rowid, E::to_cached(record, pool));
            }
            (ChangeTag::Remove, _) => {
                map.remove(&row.rowid);
            }
            (tag, _) => trace!("{}: ignoring {} row {}", table, tag, row.rowid),
        }
    }
    changeset.finish()
}

/// Applies a composite-key changeset to `set`.
pub fn apply_links(
    set: &mut HashSet<LinkRecord>,
    mut changeset: Changeset<'_, LinkRecord>,
) -> Result<ChangesetStats, SyncError> {
    for row in changeset.by_ref() {
        let Some(link) = row.record else {
            continue;
        };
        match row.tag {
            ChangeTag::Add | ChangeTag::Update => {
                set.insert(link);
            }
            ChangeTag::Remove => {
                set.remove(&link);
            }
            ChangeTag::Unchanged => {}
        }
    }
    changeset.finish()
}
