use std::sync::Arc;

use confsync::decode_postfix;
use confsync::schema::HOSTS_TABLE;
use confsync::schema::HOSTS_TEMPLATES_TABLE;
use confsync::schema::HOST_MACRO_TABLE;
use confsync::schema::ITEMS_TABLE;
use confsync::schema::TRIGGERS_TABLE;
use confsync::Operator;
use confsync::PostfixToken;
use confsync::SyncMode;

use crate::common::monitoring_database;
use crate::common::syncer_for;
use crate::common::DB_HOST;
use crate::common::WEB_HOST;

fn trigger_tokens(
    cache: &confsync::ConfigCache,
    triggerid: u64,
) -> Vec<PostfixToken> {
    let encoded = cache.blocking_read(|store| store.trigger(triggerid).unwrap().expression_bin.to_string());
    decode_postfix(&encoded).unwrap()
}

#[test]
fn test_full_cycle_builds_cache() {
    let db = Arc::new(monitoring_database());
    let (cache, syncer) = syncer_for(db);

    let report = syncer.sync_once();
    assert_eq!(report.mode, SyncMode::Init);
    assert!(report.is_success());
    assert_eq!(report.skipped(), 0);

    cache.blocking_read(|store| {
        assert_eq!(store.hosts().count(), 2);
        assert_eq!(store.item(1).unwrap().delay_sec, 60);
        assert_eq!(store.item(2).unwrap().delay_sec, 300);
        // nearest template default wins over the global value
        assert_eq!(store.item(3).unwrap().delay_sec, 5);
        assert_eq!(store.host_items(DB_HOST).count(), 2);
        assert_eq!(store.settings().hk_history, 31 * 86_400);
    });

    assert_eq!(
        trigger_tokens(&cache, 1),
        vec![
            PostfixToken::Function(21),
            PostfixToken::Number(85.0),
            PostfixToken::Operator(Operator::Gt),
        ]
    );
    // no "/" variant anywhere on the chain: global default
    assert_eq!(trigger_tokens(&cache, 2)[1], PostfixToken::Number(95.0));
}

#[test]
fn test_cycles_converge() {
    let db = Arc::new(monitoring_database());
    let (_cache, syncer) = syncer_for(db);
    syncer.sync_once();

    for _ in 0..3 {
        let report = syncer.sync_once();
        assert_eq!(report.mode, SyncMode::Update);
        assert_eq!(report.changes(), 0, "{report:?}");
    }
}

#[test]
fn test_unlinking_template_changes_inherited_values() {
    let db = Arc::new(monitoring_database());
    let (cache, syncer) = syncer_for(db.clone());
    syncer.sync_once();

    db.delete(HOSTS_TEMPLATES_TABLE, "hosttemplateid", "3").unwrap();
    let report = syncer.sync_once();

    assert_eq!(report.stats(HOSTS_TEMPLATES_TABLE).unwrap().removed, 1);
    let items = report.stats(ITEMS_TABLE).unwrap();
    assert_eq!((items.updated, items.unchanged), (1, 2));
    assert_eq!(cache.blocking_read(|store| store.item(3).unwrap().delay_sec), 3);
    assert_eq!(cache.resolve_macro(&[DB_HOST], "NGINX.INTERVAL", None).as_deref(), Some("5m"));
    assert_eq!(cache.resolve_macro(&[WEB_HOST], "AGENT.TIMEOUT", None).as_deref(), Some("5s"));
}

#[test]
fn test_removed_host_macro_falls_back_to_template() {
    let db = Arc::new(monitoring_database());
    let (cache, syncer) = syncer_for(db.clone());
    syncer.sync_once();

    db.delete(HOST_MACRO_TABLE, "hostmacroid", "4").unwrap();
    let report = syncer.sync_once();

    assert_eq!(report.stats(HOST_MACRO_TABLE).unwrap().removed, 1);
    assert_eq!(report.stats(ITEMS_TABLE).unwrap().updated, 1);
    assert_eq!(cache.blocking_read(|store| store.item(2).unwrap().delay_sec), 60);
}

#[test]
fn test_trigger_follows_context_macro() {
    let db = Arc::new(monitoring_database());
    let (cache, syncer) = syncer_for(db.clone());
    syncer.sync_once();

    db.update(HOST_MACRO_TABLE, "hostmacroid", "2", "macro", Some(r#"{$VFS.FS.PUSED.MAX.CRIT:"/"}"#))
        .unwrap();
    let report = syncer.sync_once();

    // trigger 1 loses its "/var" match, trigger 2 gains a "/" one
    assert_eq!(report.stats(TRIGGERS_TABLE).unwrap().updated, 2);
    assert_eq!(trigger_tokens(&cache, 1)[1], PostfixToken::Number(95.0));
    assert_eq!(trigger_tokens(&cache, 2)[1], PostfixToken::Number(85.0));
}

#[test]
fn test_deleted_host_is_removed() {
    let db = Arc::new(monitoring_database());
    let (cache, syncer) = syncer_for(db.clone());
    syncer.sync_once();

    db.delete(HOSTS_TABLE, "hostid", &WEB_HOST.to_string()).unwrap();
    let report = syncer.sync_once();

    assert_eq!(report.stats(HOSTS_TABLE).unwrap().removed, 1);
    assert!(cache.blocking_read(|store| store.host(WEB_HOST).is_none()));
    assert!(cache.blocking_read(|store| store.host(DB_HOST).is_some()));
}
