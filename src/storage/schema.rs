//! Tables read by the synchronizer and the columns each projection uses.

pub const CONFIG_TABLE: &str = "config";
pub const CONFIG_COLUMNS: &[&str] = &[
    "configid",
    "hk_history_global",
    "hk_history",
    "hk_trends_global",
    "hk_trends",
];

pub const HOSTS_TABLE: &str = "hosts";
pub const HOSTS_COLUMNS: &[&str] = &["hostid", "proxy_hostid", "host", "name", "status", "flags"];

pub const ITEMS_TABLE: &str = "items";
pub const ITEMS_COLUMNS: &[&str] = &[
    "itemid",
    "hostid",
    "key_",
    "type",
    "value_type",
    "delay",
    "history",
    "trends",
    "status",
    "flags",
];

pub const TRIGGERS_TABLE: &str = "triggers";
pub const TRIGGERS_COLUMNS: &[&str] = &[
    "triggerid",
    "hostid",
    "description",
    "expression",
    "priority",
    "status",
    "flags",
];

pub const GLOBAL_MACRO_TABLE: &str = "globalmacro";
pub const GLOBAL_MACRO_COLUMNS: &[&str] = &["globalmacroid", "macro", "value", "type"];

pub const HOST_MACRO_TABLE: &str = "hostmacro";
pub const HOST_MACRO_COLUMNS: &[&str] = &["hostmacroid", "hostid", "macro", "value", "type"];

pub const HOSTS_TEMPLATES_TABLE: &str = "hosts_templates";
pub const HOSTS_TEMPLATES_COLUMNS: &[&str] = &["hosttemplateid", "hostid", "templateid"];

pub const HOSTS_GROUPS_TABLE: &str = "hosts_groups";
pub const HOSTS_GROUPS_COLUMNS: &[&str] = &["hostgroupid", "hostid", "groupid"];

pub const MAINTENANCES_HOSTS_TABLE: &str = "maintenances_hosts";
pub const MAINTENANCES_HOSTS_COLUMNS: &[&str] = &["maintenance_hostid", "maintenanceid", "hostid"];

pub const MAINTENANCES_GROUPS_TABLE: &str = "maintenances_groups";
pub const MAINTENANCES_GROUPS_COLUMNS: &[&str] = &["maintenance_groupid", "maintenanceid", "groupid"];

/// Every table with its full column list, used to create an empty store.
pub const TABLES: &[(&str, &[&str])] = &[
    (CONFIG_TABLE, CONFIG_COLUMNS),
    (HOSTS_TABLE, HOSTS_COLUMNS),
    (ITEMS_TABLE, ITEMS_COLUMNS),
    (TRIGGERS_TABLE, TRIGGERS_COLUMNS),
    (GLOBAL_MACRO_TABLE, GLOBAL_MACRO_COLUMNS),
    (HOST_MACRO_TABLE, HOST_MACRO_COLUMNS),
    (HOSTS_TEMPLATES_TABLE, HOSTS_TEMPLATES_COLUMNS),
    (HOSTS_GROUPS_TABLE, HOSTS_GROUPS_COLUMNS),
    (MAINTENANCES_HOSTS_TABLE, MAINTENANCES_HOSTS_COLUMNS),
    (MAINTENANCES_GROUPS_TABLE, MAINTENANCES_GROUPS_COLUMNS),
];
