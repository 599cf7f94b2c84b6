use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use crate::storage::schema::CONFIG_TABLE;
use crate::storage::schema::GLOBAL_MACRO_TABLE;
use crate::storage::schema::HOSTS_GROUPS_TABLE;
use crate::storage::schema::HOSTS_TABLE;
use crate::storage::schema::HOSTS_TEMPLATES_TABLE;
use crate::storage::schema::HOST_MACRO_TABLE;
use crate::storage::schema::ITEMS_TABLE;
use crate::storage::schema::MAINTENANCES_GROUPS_TABLE;
use crate::storage::schema::MAINTENANCES_HOSTS_TABLE;
use crate::storage::schema::TRIGGERS_TABLE;
use crate::SyncError;

/// One step of a sync cycle. A stage runs after every stage it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyncStage {
    Settings,
    Hosts,
    UserMacros,
    Items,
    Triggers,
    HostGroups,
    MaintenanceHosts,
    MaintenanceGroups,
}

impl SyncStage {
    pub const ALL: [SyncStage; 8] = [
        SyncStage::Settings,
        SyncStage::Hosts,
        SyncStage::UserMacros,
        SyncStage::Items,
        SyncStage::Triggers,
        SyncStage::HostGroups,
        SyncStage::MaintenanceHosts,
        SyncStage::MaintenanceGroups,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SyncStage::Settings => "settings",
            SyncStage::Hosts => "hosts",
            SyncStage::UserMacros => "user_macros",
            SyncStage::Items => "items",
            SyncStage::Triggers => "triggers",
            SyncStage::HostGroups => "host_groups",
            SyncStage::MaintenanceHosts => "maintenance_hosts",
            SyncStage::MaintenanceGroups => "maintenance_groups",
        }
    }

    /// Stages whose results this stage reads through the sync context or the cache.
    pub fn dependencies(&self) -> &'static [SyncStage] {
        match self {
            SyncStage::Items => &[SyncStage::Settings, SyncStage::Hosts, SyncStage::UserMacros],
            SyncStage::Triggers => &[SyncStage::Hosts, SyncStage::UserMacros],
            SyncStage::HostGroups | SyncStage::MaintenanceHosts => &[SyncStage::Hosts],
            _ => &[],
        }
    }

    /// Tables read by the stage.
    pub fn tables(&self) -> &'static [&'static str] {
        match self {
            SyncStage::Settings => &[CONFIG_TABLE],
            SyncStage::Hosts => &[HOSTS_TABLE],
            SyncStage::UserMacros => &[GLOBAL_MACRO_TABLE, HOST_MACRO_TABLE, HOSTS_TEMPLATES_TABLE],
            SyncStage::Items => &[ITEMS_TABLE],
            SyncStage::Triggers => &[TRIGGERS_TABLE],
            SyncStage::HostGroups => &[HOSTS_GROUPS_TABLE],
            SyncStage::MaintenanceHosts => &[MAINTENANCES_HOSTS_TABLE],
            SyncStage::MaintenanceGroups => &[MAINTENANCES_GROUPS_TABLE],
        }
    }

    /// Every stage in dependency order.
    pub fn ordered() -> Result<Vec<SyncStage>, SyncError> {
        order_stages(&SyncStage::ALL, |stage| stage.dependencies())
    }
}

impl fmt::Display for SyncStage {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Orders `stages` so that each one follows its dependencies.
///
/// Dependencies outside `stages` are pulled in. Stages that become ready together
/// run in declaration order.
pub(crate) fn order_stages<'d>(
    stages: &[SyncStage],
    dependencies: impl Fn(SyncStage) -> &'d [SyncStage],
) -> Result<Vec<SyncStage>, SyncError> {
    let mut pending: BTreeMap<SyncStage, BTreeSet<SyncStage>> = BTreeMap::new();
    let mut queue: Vec<SyncStage> = stages.to_vec();
    while let Some(stage) = queue.pop() {
        if pending.contains_key(&stage) {
            continue;
        }
        let deps: BTreeSet<SyncStage> = dependencies(stage).iter().copied().collect();
        queue.extend(deps.iter().copied());
        pending.insert(stage, deps);
    }

    let mut order = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready: Vec<SyncStage> = pending
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(stage, _)| *stage)
            .collect();

        if ready.is_empty() {
            let blocked = pending.keys().next().map(SyncStage::name).unwrap_or_default();
            return Err(SyncError::StageCycle(blocked));
        }
        for stage in &ready {
            pending.remove(stage);
        }
        for deps in pending.values_mut() {
            for stage in &ready {
                deps.remove(stage);
            }
        }
        order.extend(ready);
    }
    Ok(order)
}
