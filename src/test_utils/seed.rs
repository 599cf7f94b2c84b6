use crate::storage::schema::CONFIG_TABLE;
use crate::storage::schema::GLOBAL_MACRO_TABLE;
use crate::storage::schema::HOSTS_GROUPS_TABLE;
use crate::storage::schema::HOSTS_TABLE;
use crate::storage::schema::HOSTS_TEMPLATES_TABLE;
use crate::storage::schema::HOST_MACRO_TABLE;
use crate::storage::schema::ITEMS_TABLE;
use crate::storage::schema::TRIGGERS_TABLE;
use crate::MemoryDatabase;

pub fn insert_settings(
    db: &MemoryDatabase,
    hk_history_global: bool,
    hk_history: &str,
    hk_trends_global: bool,
    hk_trends: &str,
) {
    db.insert(
        CONFIG_TABLE,
        &[
            ("configid", "1"),
            ("hk_history_global", if hk_history_global { "1" } else { "0" }),
            ("hk_history", hk_history),
            ("hk_trends_global", if hk_trends_global { "1" } else { "0" }),
            ("hk_trends", hk_trends),
        ],
    )
    .unwrap();
}

pub fn insert_host(
    db: &MemoryDatabase,
    hostid: u64,
    host: &str,
    proxy_hostid: Option<u64>,
    status: u8,
) {
    let hostid = hostid.to_string();
    let status = status.to_string();
    let proxy = proxy_hostid.map(|p| p.to_string());

    let mut values = vec![
        ("hostid", hostid.as_str()),
        ("host", host),
        ("name", host),
        ("status", status.as_str()),
        ("flags", "0"),
    ];
    if let Some(proxy) = &proxy {
        values.push(("proxy_hostid", proxy.as_str()));
    }
    db.insert(HOSTS_TABLE, &values).unwrap();
}

/// Templates live in `hosts` with status 3 and are not cached as hosts.
pub fn insert_template(
    db: &MemoryDatabase,
    hostid: u64,
    host: &str,
) {
    insert_host(db, hostid, host, None, 3);
}

pub fn insert_item(
    db: &MemoryDatabase,
    itemid: u64,
    hostid: u64,
    key: &str,
    delay: &str,
    history: &str,
    trends: &str,
) {
    let itemid = itemid.to_string();
    let hostid = hostid.to_string();
    db.insert(
        ITEMS_TABLE,
        &[
            ("itemid", itemid.as_str()),
            ("hostid", hostid.as_str()),
            ("key_", key),
            ("type", "0"),
            ("value_type", "3"),
            ("delay", delay),
            ("history", history),
            ("trends", trends),
            ("status", "0"),
            ("flags", "0"),
        ],
    )
    .unwrap();
}

pub fn insert_trigger(
    db: &MemoryDatabase,
    triggerid: u64,
    hostid: u64,
    description: &str,
    expression: &str,
) {
    let triggerid = triggerid.to_string();
    let hostid = hostid.to_string();
    db.insert(
        TRIGGERS_TABLE,
        &[
            ("triggerid", triggerid.as_str()),
            ("hostid", hostid.as_str()),
            ("description", description),
            ("expression", expression),
            ("priority", "2"),
            ("status", "0"),
            ("flags", "0"),
        ],
    )
    .unwrap();
}

pub fn insert_global_macro(
    db: &MemoryDatabase,
    globalmacroid: u64,
    text: &str,
    value: &str,
) {
    let id = globalmacroid.to_string();
    db.insert(
        GLOBAL_MACRO_TABLE,
        &[("globalmacroid", id.as_str()), ("macro", text), ("value", value), ("type", "0")],
    )
    .unwrap();
}

pub fn insert_host_macro(
    db: &MemoryDatabase,
    hostmacroid: u64,
    hostid: u64,
    text: &str,
    value: &str,
) {
    let id = hostmacroid.to_string();
    let hostid = hostid.to_string();
    db.insert(
        HOST_MACRO_TABLE,
        &[
            ("hostmacroid", id.as_str()),
            ("hostid", hostid.as_str()),
            ("macro", text),
            ("value", value),
            ("type", "0"),
        ],
    )
    .unwrap();
}

pub fn link_template(
    db: &MemoryDatabase,
    hosttemplateid: u64,
    hostid: u64,
    templateid: u64,
) {
    let id = hosttemplateid.to_string();
    let hostid = hostid.to_string();
    let templateid = templateid.to_string();
    db.insert(
        HOSTS_TEMPLATES_TABLE,
        &[
            ("hosttemplateid", id.as_str()),
            ("hostid", hostid.as_str()),
            ("templateid", templateid.as_str()),
        ],
    )
    .unwrap();
}

pub fn link_group(
    db: &MemoryDatabase,
    hostgroupid: u64,
    hostid: u64,
    groupid: u64,
) {
    let id = hostgroupid.to_string();
    let hostid = hostid.to_string();
    let groupid = groupid.to_string();
    db.insert(
        HOSTS_GROUPS_TABLE,
        &[
            ("hostgroupid", id.as_str()),
            ("hostid", hostid.as_str()),
            ("groupid", groupid.as_str()),
        ],
    )
    .unwrap();
}

/// Two hosts sharing template 100, which links template 200.
///
/// ```text
/// global  {$TIMEOUT}=30s  {$SEVERITY}=low
/// 200     {$TIMEOUT}=20s  {$DISK:"/"}=90
/// 100     {$TIMEOUT}=10s
/// 10001   {$DELAY}=2m     (linked to 100)
/// 10002                   (linked to 100)
/// ```
pub fn seeded_database() -> MemoryDatabase {
    let db = MemoryDatabase::with_config_schema();
    insert_settings(&db, false, "90d", false, "365d");

    insert_template(&db, 100, "Template App");
    insert_template(&db, 200, "Template OS");
    insert_host(&db, 10001, "web-01", None, 0);
    insert_host(&db, 10002, "web-02", Some(5), 0);

    insert_global_macro(&db, 1, "{$TIMEOUT}", "30s");
    insert_global_macro(&db, 2, "{$SEVERITY}", "low");
    insert_host_macro(&db, 1, 200, "{$TIMEOUT}", "20s");
    insert_host_macro(&db, 2, 200, r#"{$DISK:"/"}"#, "90");
    insert_host_macro(&db, 3, 100, "{$TIMEOUT}", "10s");
    insert_host_macro(&db, 4, 10001, "{$DELAY}", "2m");

    link_template(&db, 1, 100, 200);
    link_template(&db, 2, 10001, 100);
    link_template(&db, 3, 10002, 100);

    insert_item(&db, 1, 10001, "agent.ping", "{$DELAY}", "7d", "365d");
    insert_item(&db, 2, 10002, "agent.ping", "{$TIMEOUT}", "7d", "365d");
    insert_item(&db, 3, 10001, "vfs.fs.size[/]", "1h;50s/1-5,09:00-18:00", "{$KEEP}", "0");
    insert_trigger(&db, 1, 10001, "disk full", r#"{11} > {$DISK:"/"}"#);
    insert_trigger(&db, 2, 10002, "no data", "{12} = 0 or {13} < 1m");

    link_group(&db, 1, 10001, 4);
    link_group(&db, 2, 10002, 4);
    db
}
