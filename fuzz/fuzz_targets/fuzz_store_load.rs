#![no_main]

//! Fuzz target for loading the session store.
//!
//! The store file is plain JSON on disk and may be hand-edited or
//! truncated. Opening it must fail cleanly, and a store that did load must
//! survive a mutation and a reload.

use chrono::Utc;
use libfuzzer_sys::fuzz_target;
use tempfile::tempdir;

use jiralog::db::Database;

fuzz_target!(|data: &[u8]| {
    let dir = match tempdir() {
        Ok(d) => d,
        Err(_) => return,
    };
    let path = dir.path().join("db.json");
    if std::fs::write(&path, data).is_err() {
        return;
    }

    let mut db = match Database::open(&path) {
        Ok(db) => db,
        Err(_) => return,
    };

    let worklogs = db.list_worklogs(10).len();
    let _ = db.latest_worklog();
    let _ = db.list_comments(10);

    if db.start_session("FUZZ-1", Utc::now()).is_ok() {
        assert!(db.reload().is_ok());
        assert!(db.pending_session("FUZZ-1").is_some());
        assert_eq!(db.list_worklogs(10).len(), worklogs);
    }
});
