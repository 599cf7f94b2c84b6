use std::sync::Arc;

use confsync::schema::CONFIG_TABLE;
use confsync::schema::GLOBAL_MACRO_TABLE;
use confsync::schema::HOSTS_TABLE;
use confsync::schema::HOSTS_TEMPLATES_TABLE;
use confsync::schema::HOST_MACRO_TABLE;
use confsync::schema::ITEMS_TABLE;
use confsync::schema::TRIGGERS_TABLE;
use confsync::ConfigCache;
use confsync::ConfigSyncer;
use confsync::MemoryDatabase;
use confsync::SyncConfig;

pub const WEB_HOST: u64 = 10101;
pub const DB_HOST: u64 = 10102;
pub const LINUX_TEMPLATE: u64 = 500;
pub const APP_TEMPLATE: u64 = 501;

/// One template chain shared by two hosts:
///
/// ```text
/// 10101 web ─┐
///            ├─ 501 app ── 500 linux
/// 10102 db  ─┘
/// ```
pub fn monitoring_database() -> MemoryDatabase {
    let db = MemoryDatabase::with_config_schema();
    db.insert(
        CONFIG_TABLE,
        &[
            ("configid", "1"),
            ("hk_history_global", "0"),
            ("hk_history", "31d"),
            ("hk_trends_global", "0"),
            ("hk_trends", "365d"),
        ],
    )
    .unwrap();

    host(&db, LINUX_TEMPLATE, "Linux by agent", "3");
    host(&db, APP_TEMPLATE, "Nginx by agent", "3");
    host(&db, WEB_HOST, "web", "0");
    host(&db, DB_HOST, "db", "0");

    template_link(&db, 1, APP_TEMPLATE, LINUX_TEMPLATE);
    template_link(&db, 2, WEB_HOST, APP_TEMPLATE);
    template_link(&db, 3, DB_HOST, APP_TEMPLATE);

    global_macro(&db, 1, "{$AGENT.TIMEOUT}", "3s");
    global_macro(&db, 2, "{$VFS.FS.PUSED.MAX.CRIT}", "95");
    host_macro(&db, 1, LINUX_TEMPLATE, "{$AGENT.TIMEOUT}", "5s");
    host_macro(&db, 2, LINUX_TEMPLATE, r#"{$VFS.FS.PUSED.MAX.CRIT:"/var"}"#, "85");
    host_macro(&db, 3, APP_TEMPLATE, "{$NGINX.INTERVAL}", "1m");
    host_macro(&db, 4, DB_HOST, "{$NGINX.INTERVAL}", "5m");

    item(&db, 1, WEB_HOST, "nginx.status", "{$NGINX.INTERVAL}");
    item(&db, 2, DB_HOST, "nginx.status", "{$NGINX.INTERVAL}");
    item(&db, 3, DB_HOST, "agent.ping", "{$AGENT.TIMEOUT}");
    trigger(&db, 1, WEB_HOST, r#"{21} > {$VFS.FS.PUSED.MAX.CRIT:"/var"}"#);
    trigger(&db, 2, DB_HOST, r#"{22} > {$VFS.FS.PUSED.MAX.CRIT:"/"}"#);
    db
}

pub fn syncer_for(db: Arc<MemoryDatabase>) -> (Arc<ConfigCache>, ConfigSyncer) {
    let cache = Arc::new(ConfigCache::default());
    let syncer = ConfigSyncer::new(db, cache.clone(), SyncConfig::default()).unwrap();
    (cache, syncer)
}

pub fn host(
    db: &MemoryDatabase,
    hostid: u64,
    name: &str,
    status: &str,
) {
    let hostid = hostid.to_string();
    db.insert(
        HOSTS_TABLE,
        &[
            ("hostid", hostid.as_str()),
            ("host", name),
            ("name", name),
            ("status", status),
            ("flags", "0"),
        ],
    )
    .unwrap();
}

pub fn template_link(
    db: &MemoryDatabase,
    id: u64,
    hostid: u64,
    templateid: u64,
) {
    let (id, hostid, templateid) = (id.to_string(), hostid.to_string(), templateid.to_string());
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

pub fn global_macro(
    db: &MemoryDatabase,
    id: u64,
    text: &str,
    value: &str,
) {
    let id = id.to_string();
    db.insert(
        GLOBAL_MACRO_TABLE,
        &[("globalmacroid", id.as_str()), ("macro", text), ("value", value), ("type", "0")],
    )
    .unwrap();
}

pub fn host_macro(
    db: &MemoryDatabase,
    id: u64,
    hostid: u64,
    text: &str,
    value: &str,
) {
    let (id, hostid) = (id.to_string(), hostid.to_string());
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

pub fn item(
    db: &MemoryDatabase,
    itemid: u64,
    hostid: u64,
    key: &str,
    delay: &str,
) {
    let (itemid, hostid) = (itemid.to_string(), hostid.to_string());
    db.insert(
        ITEMS_TABLE,
        &[
            ("itemid", itemid.as_str()),
            ("hostid", hostid.as_str()),
            ("key_", key),
            ("type", "0"),
            ("value_type", "3"),
            ("delay", delay),
            ("history", "7d"),
            ("trends", "0"),
            ("status", "0"),
            ("flags", "0"),
        ],
    )
    .unwrap();
}

pub fn trigger(
    db: &MemoryDatabase,
    triggerid: u64,
    hostid: u64,
    expression: &str,
) {
    let (triggerid, hostid) = (triggerid.to_string(), hostid.to_string());
    db.insert(
        TRIGGERS_TABLE,
        &[
            ("triggerid", triggerid.as_str()),
            ("hostid", hostid.as_str()),
            ("description", "filesystem almost full"),
            ("expression", expression),
            ("priority", "4"),
            ("status", "0"),
            ("flags", "0"),
        ],
    )
    .unwrap();
}
