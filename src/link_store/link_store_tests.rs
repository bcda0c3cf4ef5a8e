use super::*;
use chrono::{Duration, TimeZone};
use tempfile::tempdir;

fn at(h: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 3, 1, h, 0, 0).single().unwrap() }

fn exercise(store: &dyn LinkStore) {
    assert_eq!(store.get("demo1").unwrap(), None);
    let link = Link::new("demo1", at(12), vec!["a.txt".into(), "b.pdf".into()]);
    store.put_replace(&link).unwrap();
    assert_eq!(store.get("demo1").unwrap(), Some(link.clone()));

    // Replacement is total, not a merge.
    let replaced = Link::new("demo1", at(18), vec!["c.md".into()]);
    store.put_replace(&replaced).unwrap();
    assert_eq!(store.get("demo1").unwrap(), Some(replaced.clone()));
    assert_eq!(store.scan_all().unwrap(), vec![replaced]);

    store.put_replace(&Link::new("alpha", at(1), vec![])).unwrap();
    let slugs: Vec<String> = store.scan_all().unwrap().into_iter().map(|l| l.slug).collect();
    assert_eq!(slugs, vec!["alpha", "demo1"]);

    assert!(store.delete("demo1").unwrap());
    assert!(!store.delete("demo1").unwrap());
    assert_eq!(store.get("demo1").unwrap(), None);
}

#[test]
fn memory_store_contract() {
    let store = MemoryLinkStore::new();
    exercise(&store);
    assert_eq!(store.len(), 1);
}

#[test]
fn sqlite_store_contract() {
    let store = SqliteLinkStore::open_in_memory().unwrap();
    exercise(&store);
}

#[test]
fn sqlite_rows_survive_reopen() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("nested").join("files.db");
    let link = Link::new("keep", at(9) + Duration::milliseconds(250), vec!["x.txt".into()]);
    {
        let store = SqliteLinkStore::open(&db).unwrap();
        store.put_replace(&link).unwrap();
    }
    let store = SqliteLinkStore::open(&db).unwrap();
    assert_eq!(store.get("keep").unwrap(), Some(link));
}

#[test]
fn corrupt_rows_are_skipped_by_scan_and_fail_get() {
    let store = SqliteLinkStore::open_in_memory().unwrap();
    store.put_replace(&Link::new("good", at(3), vec!["a.txt".into()])).unwrap();
    store.put_raw("bad-json", "2025-03-01T03:00:00Z", "not json").unwrap();
    store.put_raw("bad-date", "yesterday", "[]").unwrap();
    let slugs: Vec<String> = store.scan_all().unwrap().into_iter().map(|l| l.slug).collect();
    assert_eq!(slugs, vec!["good"]);
    assert!(matches!(store.get("bad-json"), Err(AppError::Io(_))));
}

#[test]
fn zone_less_timestamps_read_as_utc() {
    let store = SqliteLinkStore::open_in_memory().unwrap();
    store.put_raw("legacy", "2025-03-01T12:00:00.123456", "[\"a.txt\"]").unwrap();
    let link = store.get("legacy").unwrap().unwrap();
    assert_eq!(link.expiry, at(12) + Duration::microseconds(123_456));
}

#[test]
fn expiry_is_strictly_after() {
    let link = Link::new("s", at(12), vec![]);
    assert!(!link.is_expired_at(at(11)));
    assert!(!link.is_expired_at(at(12)));
    assert!(link.is_expired_at(at(12) + Duration::seconds(1)));
}
