use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::Weak;
use std::time::Duration;

use tokio::sync::watch;
use tracing_test::traced_test;

use super::*;
use crate::storage::schema::CONFIG_TABLE;
use crate::storage::schema::GLOBAL_MACRO_TABLE;
use crate::storage::schema::HOSTS_GROUPS_TABLE;
use crate::storage::schema::HOSTS_TABLE;
use crate::storage::schema::HOSTS_TEMPLATES_TABLE;
use crate::storage::schema::HOST_MACRO_TABLE;
use crate::storage::schema::ITEMS_TABLE;
use crate::storage::schema::TRIGGERS_TABLE;
use crate::test_utils::insert_item;
use crate::test_utils::link_group;
use crate::test_utils::seeded_database;
use crate::ConfigCache;
use crate::ConfigDatabase;
use crate::DatabaseError;
use crate::MemoryDatabase;
use crate::Query;
use crate::RowCursor;
use crate::SyncConfig;
use crate::SyncMode;
use crate::HOST_GROUPS;

fn syncer_for(db: Arc<MemoryDatabase>) -> ConfigSyncer {
    ConfigSyncer::new(db, Arc::new(ConfigCache::default()), SyncConfig::default()).unwrap()
}

fn seeded() -> (Arc<MemoryDatabase>, ConfigSyncer) {
    let db = Arc::new(seeded_database());
    let syncer = syncer_for(db.clone());
    (db, syncer)
}

#[test]
#[traced_test]
fn test_first_cycle_loads_everything() {
    let (_db, syncer) = seeded();
    let report = syncer.sync_once();

    assert_eq!(report.cycle, 1);
    assert_eq!(report.mode, SyncMode::Init);
    assert!(report.is_success());
    assert_eq!(report.stats(CONFIG_TABLE).unwrap().added, 1);
    assert_eq!(report.stats(HOSTS_TABLE).unwrap().added, 2);
    assert_eq!(report.stats(GLOBAL_MACRO_TABLE).unwrap().added, 2);
    assert_eq!(report.stats(HOST_MACRO_TABLE).unwrap().added, 4);
    assert_eq!(report.stats(HOSTS_TEMPLATES_TABLE).unwrap().added, 3);
    assert_eq!(report.stats(TRIGGERS_TABLE).unwrap().added, 2);
    assert_eq!(report.stats(HOSTS_GROUPS_TABLE).unwrap().added, 2);
    assert_eq!(report.changes(), 18);

    let items = report.stats(ITEMS_TABLE).unwrap();
    assert_eq!((items.added, items.skipped), (2, 1));
    assert!(logs_contain("[cycle-1] items: skipping row"));

    syncer.cache().blocking_read(|store| {
        assert_eq!(store.item(1).unwrap().delay_sec, 120);
        assert_eq!(store.item(2).unwrap().delay_sec, 10);
        assert!(store.item(3).is_none());
        assert!(store.host(100).is_none());
        assert_eq!(store.host(10002).unwrap().proxy_hostid, 5);
        assert_eq!(store.linked(&HOST_GROUPS, 10001), vec![4]);
    });
}

#[test]
fn test_second_cycle_finds_nothing_to_do() {
    let (_db, syncer) = seeded();
    syncer.sync_once();
    let revision = syncer.cache().macros().revision();

    let report = syncer.sync_once();

    assert_eq!(report.mode, SyncMode::Update);
    assert_eq!(report.changes(), 0);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.stats(HOSTS_TABLE).unwrap().unchanged, 2);
    assert_eq!(syncer.cache().macros().revision(), revision);
    assert_eq!(syncer.cycles(), 2);
}

#[test]
fn test_host_relocation_refreshes_its_items() {
    let (db, syncer) = seeded();
    syncer.sync_once();

    db.update(HOSTS_TABLE, "hostid", "10002", "proxy_hostid", Some("6")).unwrap();
    let report = syncer.sync_once();

    assert_eq!(report.stats(HOSTS_TABLE).unwrap().updated, 1);
    let items = report.stats(ITEMS_TABLE).unwrap();
    assert_eq!((items.updated, items.unchanged), (1, 1));
}

#[test]
fn test_macro_change_reaches_items_and_triggers() {
    let (db, syncer) = seeded();
    syncer.sync_once();

    db.update(HOST_MACRO_TABLE, "hostmacroid", "3", "value", Some("45s")).unwrap();
    db.update(HOST_MACRO_TABLE, "hostmacroid", "2", "value", Some("95")).unwrap();
    let report = syncer.sync_once();

    assert_eq!(report.stats(HOST_MACRO_TABLE).unwrap().updated, 2);
    assert_eq!(report.stats(ITEMS_TABLE).unwrap().updated, 1);
    assert_eq!(report.stats(TRIGGERS_TABLE).unwrap().updated, 1);
    assert_eq!(syncer.cache().blocking_read(|store| store.item(2).unwrap().delay_sec), 45);
    assert_eq!(syncer.cache().resolve_macro(&[10002], "TIMEOUT", None).as_deref(), Some("45s"));
}

#[test]
fn test_housekeeping_settings_override_item_periods() {
    let (db, syncer) = seeded();
    syncer.sync_once();

    db.update(CONFIG_TABLE, "configid", "1", "hk_history_global", Some("1")).unwrap();
    db.update(CONFIG_TABLE, "configid", "1", "hk_history", Some("1d")).unwrap();
    let report = syncer.sync_once();

    let items = report.stats(ITEMS_TABLE).unwrap();
    // item 3 no longer depends on its unresolvable history macro
    assert_eq!((items.added, items.updated, items.skipped), (1, 2, 0));
    syncer.cache().blocking_read(|store| {
        assert!(store.items().all(|item| item.history_sec == 86_400));
        assert_eq!(store.settings().hk_history, 86_400);
    });
}

#[test]
fn test_failed_table_keeps_cache_and_recovers() {
    let (db, syncer) = seeded();
    syncer.sync_once();

    db.set_failing(ITEMS_TABLE, true);
    db.delete(ITEMS_TABLE, "itemid", "1").unwrap();
    link_group(&db, 3, 10002, 7);
    let report = syncer.sync_once();

    assert!(!report.is_success());
    assert_eq!(report.failed, vec![ITEMS_TABLE]);
    assert!(report.stats(ITEMS_TABLE).is_none());
    assert_eq!(report.stats(HOSTS_GROUPS_TABLE).unwrap().added, 1);
    assert!(syncer.cache().blocking_read(|store| store.item(1).is_some()));

    db.set_failing(ITEMS_TABLE, false);
    insert_item(&db, 4, 10002, "agent.hostname", "1h", "7d", "0");
    let report = syncer.sync_once();

    assert!(report.is_success());
    let items = report.stats(ITEMS_TABLE).unwrap();
    assert_eq!((items.added, items.removed), (1, 1));
    syncer.cache().blocking_read(|store| {
        assert!(store.item(1).is_none());
        assert_eq!(store.item(4).unwrap().delay_sec, 3_600);
    });
}

#[test]
fn test_failed_macro_table_keeps_snapshot() {
    let (db, syncer) = seeded();
    syncer.sync_once();

    db.set_failing(HOSTS_TEMPLATES_TABLE, true);
    db.update(HOST_MACRO_TABLE, "hostmacroid", "4", "value", Some("5m")).unwrap();
    let report = syncer.sync_once();

    assert_eq!(report.failed, vec![HOSTS_TEMPLATES_TABLE]);
    assert_eq!(syncer.cache().macros().revision(), 1);
    assert_eq!(syncer.cache().resolve_macro(&[10001], "DELAY", None).as_deref(), Some("2m"));
    // items still resolve against the last good snapshot
    assert_eq!(report.stats(ITEMS_TABLE).unwrap().changes(), 0);
}

/// Calls back into the syncer from inside a query.
struct ReentrantDatabase {
    syncer: OnceLock<Weak<ConfigSyncer>>,
}

impl ConfigDatabase for ReentrantDatabase {
    fn select(
        &self,
        _query: &Query,
    ) -> std::result::Result<Box<dyn RowCursor>, DatabaseError> {
        if let Some(syncer) = self.syncer.get().and_then(Weak::upgrade) {
            syncer.sync_once();
        }
        Err(DatabaseError::Unavailable("not reached".to_string()))
    }
}

#[test]
#[should_panic(expected = "re-entrant config sync")]
fn test_reentrant_cycle_panics() {
    let db = Arc::new(ReentrantDatabase {
        syncer: OnceLock::new(),
    });
    let syncer = Arc::new(
        ConfigSyncer::new(db.clone(), Arc::new(ConfigCache::default()), SyncConfig::default()).unwrap(),
    );
    let _ = db.syncer.set(Arc::downgrade(&syncer));

    syncer.sync_once();
}

/// Records whether the store lock was held while a query ran.
struct LockWatchingDatabase {
    inner: MemoryDatabase,
    cache: Arc<ConfigCache>,
    selected_under_lock: AtomicBool,
}

impl ConfigDatabase for LockWatchingDatabase {
    fn select(
        &self,
        query: &Query,
    ) -> std::result::Result<Box<dyn RowCursor>, DatabaseError> {
        if self.cache.is_locked() {
            self.selected_under_lock.store(true, Ordering::SeqCst);
        }
        self.inner.select(query)
    }
}

#[test]
fn test_update_cycle_queries_without_store_lock() {
    let cache = Arc::new(ConfigCache::default());
    let db = Arc::new(LockWatchingDatabase {
        inner: seeded_database(),
        cache: cache.clone(),
        selected_under_lock: AtomicBool::new(false),
    });
    let syncer = ConfigSyncer::new(db.clone(), cache, SyncConfig::default()).unwrap();

    syncer.sync_once();
    insert_item(&db.inner, 4, 10001, "net.if.in", "30s", "7d", "0");
    let report = syncer.sync_once();

    assert_eq!(report.mode, SyncMode::Update);
    assert_eq!(report.stats(ITEMS_TABLE).unwrap().added, 1);
    assert!(!db.selected_under_lock.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_stops_on_shutdown() {
    let db = Arc::new(seeded_database());
    let config = SyncConfig {
        interval_in_sec: 1,
        ..SyncConfig::default()
    };
    let syncer = Arc::new(ConfigSyncer::new(db, Arc::new(ConfigCache::default()), config).unwrap());
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let handle = tokio::spawn(syncer.clone().run(shutdown_rx));
    tokio::time::timeout(Duration::from_secs(5), async {
        while syncer.cycles() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    shutdown_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();

    assert!(result.is_ok());
    assert_eq!(syncer.cache().blocking_read(|store| store.hosts().count()), 2);
}
