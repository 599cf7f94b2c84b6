use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use confsync::schema::HOST_MACRO_TABLE;

use crate::common::monitoring_database;
use crate::common::syncer_for;
use crate::common::DB_HOST;
use crate::common::WEB_HOST;

#[test]
fn test_held_snapshot_is_isolated_from_updates() {
    let db = Arc::new(monitoring_database());
    let (cache, syncer) = syncer_for(db.clone());
    syncer.sync_once();

    let held = cache.macros().snapshot();
    db.update(HOST_MACRO_TABLE, "hostmacroid", "3", "value", Some("2m")).unwrap();
    syncer.sync_once();

    let before = held.resolve(&[WEB_HOST], "NGINX.INTERVAL", None).unwrap();
    assert_eq!(before.value.as_str(), "1m");
    assert_eq!(cache.resolve_macro(&[WEB_HOST], "{$NGINX.INTERVAL}", None).as_deref(), Some("2m"));
    assert_eq!(cache.macros().revision(), held.revision() + 1);
}

#[test]
fn test_readers_never_see_half_applied_cycles() {
    let db = Arc::new(monitoring_database());
    let (cache, syncer) = syncer_for(db.clone());
    syncer.sync_once();

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut reads = 0;
                loop {
                    let finished = done.load(Ordering::Acquire);
                    let snapshot = cache.macros().snapshot();
                    let web = snapshot.resolve(&[WEB_HOST], "NGINX.INTERVAL", None).unwrap();
                    let on_db = snapshot.resolve(&[DB_HOST], "NGINX.INTERVAL", None).unwrap();
                    // both definitions change together in every cycle
                    let expected = if snapshot.revision() == 1 { "5m" } else { web.value.as_str() };
                    assert_eq!(on_db.value.as_str(), expected);
                    reads += 1;
                    if finished {
                        return reads;
                    }
                }
            })
        })
        .collect();

    for minutes in 10..30 {
        let value = format!("{minutes}m");
        db.update(HOST_MACRO_TABLE, "hostmacroid", "3", "value", Some(&value)).unwrap();
        db.update(HOST_MACRO_TABLE, "hostmacroid", "4", "value", Some(&value)).unwrap();
        let report = syncer.sync_once();
        assert!(report.is_success());
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(cache.macros().revision(), 21);
    assert_eq!(cache.resolve_macro(&[DB_HOST], "NGINX.INTERVAL", None).as_deref(), Some("29m"));
}
