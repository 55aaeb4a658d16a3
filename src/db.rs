//! JSON file store for pending sessions, worklogs and comments.
//!
//! Every mutation re-reads the file first and writes it back before
//! returning. Writes land in a temporary file that is renamed over the
//! store, so readers never observe a half-written file. Two invocations
//! that mutate at the same moment can still lose one of the updates.

use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, TimelogError};
use crate::models::{CommentEntry, PendingSession, StoreData, WorklogEntry};

pub struct Database {
    path: PathBuf,
    data: StoreData,
}

impl Database {
    /// Opens the store at `path`, creating an empty one if it does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = parent_dir(path) {
            fs::create_dir_all(parent)?;
        }

        let mut db = Database {
            path: path.to_path_buf(),
            data: StoreData::default(),
        };
        if path.exists() {
            db.reload()?;
        } else {
            db.persist(&db.data)?;
        }
        Ok(db)
    }

    /// Picks up changes written by other invocations.
    pub fn reload(&mut self) -> Result<()> {
        let content = fs::read_to_string(&self.path)?;
        self.data = if content.trim().is_empty() {
            StoreData::default()
        } else {
            serde_json::from_str(&content)?
        };
        Ok(())
    }

    fn persist(&self, data: &StoreData) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        let dir = parent_dir(&self.path).unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(
            path = %self.path.display(),
            pending = data.issues.len(),
            worklogs = data.worklogs.len(),
            comments = data.comments.len(),
            "store written"
        );
        Ok(())
    }

    /// Re-read, apply `f` to a copy, write the copy, and only then swap it
    /// in. A failing `f` or write leaves memory matching the disk.
    fn update<R>(&mut self, f: impl FnOnce(&mut StoreData) -> Result<R>) -> Result<R> {
        self.reload()?;
        let mut next = self.data.clone();
        let out = f(&mut next)?;
        self.persist(&next)?;
        self.data = next;
        Ok(out)
    }

    // Pending sessions
    pub fn start_session(&mut self, issue_key: &str, now: DateTime<Utc>) -> Result<PendingSession> {
        self.update(|data| {
            let session = PendingSession::new(issue_key, now);
            if let Some(previous) = data.issues.insert(issue_key.to_string(), session.clone()) {
                debug!(issue = issue_key, started = %previous.started_at, "replaced pending session");
            }
            Ok(session)
        })
    }

    pub fn stop_session(&mut self, issue_key: &str, now: DateTime<Utc>) -> Result<String> {
        self.update(|data| match data.issues.get_mut(issue_key) {
            Some(session) => {
                session.ended_at = Some(now);
                Ok(session.issue_key.clone())
            }
            None => Err(no_session(issue_key)),
        })
    }

    pub fn set_session_comment(&mut self, issue_key: &str, comment: &str) -> Result<()> {
        self.update(|data| match data.issues.get_mut(issue_key) {
            Some(session) => {
                session.comment = Some(comment.to_string());
                Ok(())
            }
            None => Err(no_session(issue_key)),
        })
    }

    pub fn pending_session(&self, issue_key: &str) -> Option<&PendingSession> {
        self.data.issues.get(issue_key)
    }

    pub fn pending_sessions(&self) -> Vec<&PendingSession> {
        self.data.issues.values().collect()
    }

    /// Drops the pending session for `issue_key` and records its worklog
    /// in a single write.
    pub fn complete_session(&mut self, issue_key: &str, entry: WorklogEntry) -> Result<()> {
        self.update(|data| {
            if data.issues.remove(issue_key).is_none() {
                debug!(issue = issue_key, "pending session already gone when completing");
            }
            data.worklogs.push(entry);
            Ok(())
        })
    }

    // Worklogs
    pub fn add_worklog(&mut self, entry: WorklogEntry) -> Result<()> {
        self.update(|data| {
            data.worklogs.push(entry);
            Ok(())
        })
    }

    /// The `max` most recently added worklogs, oldest of them first.
    pub fn list_worklogs(&self, max: usize) -> &[WorklogEntry] {
        tail(&self.data.worklogs, max)
    }

    pub fn worklog_by_id(&self, id: &str) -> Option<&WorklogEntry> {
        self.data.worklogs.iter().find(|w| w.id == id)
    }

    pub fn latest_worklog(&self) -> Option<&WorklogEntry> {
        self.data.worklogs.last()
    }

    pub fn remove_worklog(&mut self, id: &str) -> Result<bool> {
        self.update(|data| {
            let before = data.worklogs.len();
            data.worklogs.retain(|w| w.id != id);
            Ok(data.worklogs.len() < before)
        })
    }

    // Comments
    pub fn add_comment(&mut self, entry: CommentEntry) -> Result<()> {
        self.update(|data| {
            data.comments.push(entry);
            Ok(())
        })
    }

    /// The `max` most recently added comments, oldest of them first.
    pub fn list_comments(&self, max: usize) -> &[CommentEntry] {
        tail(&self.data.comments, max)
    }

    pub fn comment_by_id(&self, id: &str) -> Option<&CommentEntry> {
        self.data.comments.iter().find(|c| c.id == id)
    }

    pub fn latest_comment(&self) -> Option<&CommentEntry> {
        self.data.comments.last()
    }

    pub fn remove_comment(&mut self, id: &str) -> Result<bool> {
        self.update(|data| {
            let before = data.comments.len();
            data.comments.retain(|c| c.id != id);
            Ok(data.comments.len() < before)
        })
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

fn tail<T>(items: &[T], max: usize) -> &[T] {
    &items[items.len().saturating_sub(max)..]
}

fn no_session(issue_key: &str) -> TimelogError {
    TimelogError::not_found(format!("No timer running for {}", issue_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("db.json");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    fn worklog(id: &str) -> WorklogEntry {
        WorklogEntry {
            id: id.to_string(),
            issue_key: "PROJ-1".to_string(),
            comment: format!("work {}", id),
            time_spent_seconds: 60,
            started: "2024-06-12T07:00:00.000+0000".to_string(),
        }
    }

    fn comment(id: &str) -> CommentEntry {
        CommentEntry {
            id: id.to_string(),
            issue_key: "PROJ-1".to_string(),
            comment: format!("comment {}", id),
            created: "2024-06-12T07:00:00.000+0000".to_string(),
        }
    }

    // ==================== Unit Tests ====================

    #[test]
    fn test_open_creates_file_and_parents() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("db.json");
        Database::open(&db_path).unwrap();

        let content = fs::read_to_string(&db_path).unwrap();
        let data: StoreData = serde_json::from_str(&content).unwrap();
        assert_eq!(data, StoreData::default());
    }

    #[test]
    fn test_open_accepts_file_without_comments_key() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("db.json");
        fs::write(&db_path, r#"{"issues": {}, "worklogs": []}"#).unwrap();

        let db = Database::open(&db_path).unwrap();
        assert!(db.list_comments(10).is_empty());
    }

    #[test]
    fn test_open_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("db.json");
        fs::write(&db_path, "{ not json").unwrap();

        let result = Database::open(&db_path);
        assert!(matches!(result, Err(TimelogError::Json(_))));
    }

    #[test]
    fn test_start_twice_keeps_one_session() {
        let (mut db, _dir) = setup_test_db();
        let t0 = Utc::now();
        let t1 = t0 + Duration::minutes(5);

        db.start_session("PROJ-1", t0).unwrap();
        db.start_session("PROJ-1", t1).unwrap();

        assert_eq!(db.pending_sessions().len(), 1);
        assert_eq!(db.pending_session("PROJ-1").unwrap().started_at, t1);
    }

    #[test]
    fn test_stop_sets_end_time() {
        let (mut db, _dir) = setup_test_db();
        let t0 = Utc::now();
        db.start_session("PROJ-1", t0).unwrap();

        let key = db.stop_session("PROJ-1", t0 + Duration::hours(1)).unwrap();
        assert_eq!(key, "PROJ-1");

        let session = db.pending_session("PROJ-1").unwrap();
        assert!(session.is_stopped());
        assert_eq!(session.elapsed_seconds(Utc::now()), 3600);
    }

    #[test]
    fn test_stop_without_start_is_not_found() {
        let (mut db, _dir) = setup_test_db();

        let result = db.stop_session("PROJ-9", Utc::now());
        assert!(result.unwrap_err().is_not_found());
        assert!(db.pending_session("PROJ-9").is_none());
        assert!(db.pending_sessions().is_empty());
    }

    #[test]
    fn test_session_comment() {
        let (mut db, _dir) = setup_test_db();
        db.start_session("PROJ-1", Utc::now()).unwrap();
        db.set_session_comment("PROJ-1", "Pairing").unwrap();

        assert_eq!(
            db.pending_session("PROJ-1").unwrap().comment.as_deref(),
            Some("Pairing")
        );
        assert!(db.set_session_comment("PROJ-2", "x").unwrap_err().is_not_found());
    }

    #[test]
    fn test_complete_session_moves_to_worklogs() {
        let (mut db, _dir) = setup_test_db();
        db.start_session("PROJ-1", Utc::now()).unwrap();

        db.complete_session("PROJ-1", worklog("10001")).unwrap();

        assert!(db.pending_session("PROJ-1").is_none());
        assert_eq!(db.list_worklogs(10), &[worklog("10001")]);
    }

    #[test]
    fn test_changes_survive_reopen() {
        let (mut db, dir) = setup_test_db();
        db.start_session("PROJ-1", Utc::now()).unwrap();
        db.add_worklog(worklog("1")).unwrap();
        db.add_comment(comment("2")).unwrap();

        let reopened = Database::open(&dir.path().join("db.json")).unwrap();
        assert!(reopened.pending_session("PROJ-1").is_some());
        assert_eq!(reopened.list_worklogs(10).len(), 1);
        assert_eq!(reopened.list_comments(10).len(), 1);
    }

    #[test]
    fn test_mutation_rereads_file() {
        let (mut first, dir) = setup_test_db();
        let mut second = Database::open(&dir.path().join("db.json")).unwrap();

        second.add_worklog(worklog("from-second")).unwrap();
        first.add_worklog(worklog("from-first")).unwrap();

        let ids: Vec<&str> = first.list_worklogs(10).iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["from-second", "from-first"]);
    }

    #[test]
    fn test_list_worklogs_returns_most_recent_in_order() {
        let (mut db, _dir) = setup_test_db();
        for id in ["1", "2", "3", "4"] {
            db.add_worklog(worklog(id)).unwrap();
        }

        let ids: Vec<&str> = db.list_worklogs(2).iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "4"]);
        assert_eq!(db.list_worklogs(100).len(), 4);
        assert!(db.list_worklogs(0).is_empty());
    }

    #[test]
    fn test_remove_worklog() {
        let (mut db, _dir) = setup_test_db();
        db.add_worklog(worklog("1")).unwrap();
        db.add_worklog(worklog("2")).unwrap();

        assert!(db.remove_worklog("1").unwrap());
        assert!(!db.remove_worklog("1").unwrap());
        assert_eq!(db.latest_worklog().unwrap().id, "2");
        assert!(db.worklog_by_id("1").is_none());
    }

    #[test]
    fn test_comments_lookup_and_remove() {
        let (mut db, _dir) = setup_test_db();
        db.add_comment(comment("7")).unwrap();
        db.add_comment(comment("8")).unwrap();

        assert_eq!(db.comment_by_id("7").unwrap().comment, "comment 7");
        assert_eq!(db.latest_comment().unwrap().id, "8");
        assert!(db.remove_comment("8").unwrap());
        assert_eq!(db.latest_comment().unwrap().id, "7");
    }

    #[test]
    fn test_failed_update_leaves_store_untouched() {
        let (mut db, dir) = setup_test_db();
        db.add_worklog(worklog("1")).unwrap();
        let before = fs::read_to_string(dir.path().join("db.json")).unwrap();

        assert!(db.stop_session("PROJ-1", Utc::now()).is_err());

        let after = fs::read_to_string(dir.path().join("db.json")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_failed_write_keeps_memory_unchanged() {
        let (mut db, dir) = setup_test_db();
        db.add_worklog(worklog("1")).unwrap();
        let path = dir.path().join("db.json");

        // a non-empty directory in place of the file makes the rename fail
        let result = db.update(|data| {
            data.worklogs.push(worklog("2"));
            fs::remove_file(&path)?;
            fs::create_dir(&path)?;
            fs::write(path.join("blocker"), "x")?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(db.list_worklogs(10), &[worklog("1")]);
        assert!(db.worklog_by_id("2").is_none());
    }

    // ==================== Property-Based Tests ====================

    proptest! {
        #[test]
        fn prop_one_session_per_issue(starts in proptest::collection::vec(0usize..4, 1..12)) {
            let (mut db, _dir) = setup_test_db();
            let keys = ["A-1", "B-2", "C-3", "D-4"];
            let base = Utc::now();

            for (i, k) in starts.iter().enumerate() {
                db.start_session(keys[*k], base + Duration::seconds(i as i64)).unwrap();
            }

            let mut distinct: Vec<usize> = starts.clone();
            distinct.sort_unstable();
            distinct.dedup();
            prop_assert_eq!(db.pending_sessions().len(), distinct.len());

            // last start wins
            for k in distinct {
                let last = starts.iter().rposition(|s| *s == k).unwrap();
                let session = db.pending_session(keys[k]).unwrap();
                prop_assert_eq!(session.started_at, base + Duration::seconds(last as i64));
            }
        }

        #[test]
        fn prop_list_is_suffix(count in 0usize..20, max in 0usize..25) {
            let (mut db, _dir) = setup_test_db();
            for i in 0..count {
                db.add_worklog(worklog(&i.to_string())).unwrap();
            }

            let listed = db.list_worklogs(max);
            prop_assert_eq!(listed.len(), count.min(max));
            if let Some(last) = listed.last() {
                prop_assert_eq!(last.id.clone(), (count - 1).to_string());
            }
        }
    }
}
