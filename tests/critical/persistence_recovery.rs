//! Snapshot files that are missing, corrupt or stale must degrade to a fresh login.

use portal_session_core::{CookieRecord, CookieStore, SessionState};
use tempfile::TempDir;

#[test]
fn p0_corrupt_snapshot_loads_as_no_session() {
    let temp = TempDir::new().expect("temp dir");
    let path = temp.path().join("session.json");
    std::fs::write(&path, b"{ not json").expect("write");

    let store = CookieStore::new(&path);
    assert!(store.try_load().is_err());
    assert!(store.load().is_none());
}

#[test]
fn p0_snapshot_survives_store_reopen() {
    let temp = TempDir::new().expect("temp dir");
    let path = temp.path().join("nested/dir/session.json");

    CookieStore::new(&path)
        .save_records(&[CookieRecord::new("127.0.0.1", "/", "sid", "v1")])
        .expect("save");

    let session = CookieStore::new(&path).load().expect("snapshot present");
    assert_eq!(session.state(), SessionState::Unauthenticated);
    let cookies = session.snapshot();
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].value(), "v1");
}

#[test]
fn p0_expired_cookies_are_dropped_on_load() {
    let temp = TempDir::new().expect("temp dir");
    let path = temp.path().join("session.json");
    let mut expired = CookieRecord::new("127.0.0.1", "/", "old", "gone");
    expired.expires = 1;
    let live = CookieRecord::new("127.0.0.1", "/", "sid", "kept");

    CookieStore::new(&path)
        .save_records(&[expired, live])
        .expect("save");

    let session = CookieStore::new(&path).load().expect("snapshot present");
    let names: Vec<String> = session.snapshot().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["sid".to_string()]);
}

#[test]
fn p0_clear_removes_snapshot_and_is_idempotent() {
    let temp = TempDir::new().expect("temp dir");
    let path = temp.path().join("session.json");
    let store = CookieStore::new(&path);
    store
        .save_records(&[CookieRecord::new("127.0.0.1", "/", "sid", "v")])
        .expect("save");

    assert!(store.clear().expect("clear"));
    assert!(!path.exists());
    assert!(!store.clear().expect("second clear"));
}
