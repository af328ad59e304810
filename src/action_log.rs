//! Persistent action log
//!
//! Every decision the sorter makes is appended to an SQLite table. The log
//! is cumulative across runs and doubles as the content index for duplicate
//! detection: a fingerprint that appears in any row has been seen before.
//!
//! Rows are never updated or deleted. Each insert is its own committed
//! statement, so an interrupted run leaves only complete entries behind.

use crate::error::{Error, Result};
use crate::hash::Fingerprint;
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Kind of decision recorded in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// The file was copied into the destination tree
    Copy,
    /// The content was already recorded by an earlier entry
    DuplicateSeen,
    /// Identical content already sits at the target path
    DuplicateRef,
    /// Dry run, the file would have been copied
    DryRun,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Copy,
        ActionKind::DuplicateSeen,
        ActionKind::DuplicateRef,
        ActionKind::DryRun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Copy => "copy",
            ActionKind::DuplicateSeen => "duplicate_seen",
            ActionKind::DuplicateRef => "duplicate_ref",
            ActionKind::DryRun => "dry_run",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownAction(s.to_string()))
    }
}

/// One row of the action log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub id: i64,
    /// Local time, ISO-8601 with second precision
    pub timestamp: String,
    pub action: ActionKind,
    pub src: PathBuf,
    pub dst: PathBuf,
    /// Hex digest, or the unavailable marker
    pub checksum: String,
}

/// Handle to the action log database
pub struct ActionLog {
    conn: Connection,
    db_path: PathBuf,
}

impl ActionLog {
    /// Open or create the log, including its parent directories and schema
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path).map_err(|e| Error::LogOpen {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::init_schema(&conn)?;
        debug!(db = %path.display(), "Opened action log");

        Ok(Self {
            conn,
            db_path: path.to_path_buf(),
        })
    }

    /// In-memory log, used by tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn,
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS actions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT,
                action TEXT,
                src TEXT,
                dst TEXT,
                checksum TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_checksum ON actions(checksum)",
            [],
        )?;

        Ok(())
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Append an entry stamped with the current local time, returning its id
    pub fn record(
        &self,
        action: ActionKind,
        src: &Path,
        dst: &Path,
        fingerprint: &Fingerprint,
    ) -> Result<i64> {
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();

        self.conn.execute(
            "INSERT INTO actions (timestamp, action, src, dst, checksum) VALUES (?, ?, ?, ?, ?)",
            params![
                timestamp,
                action.as_str(),
                src.to_string_lossy().into_owned(),
                dst.to_string_lossy().into_owned(),
                fingerprint.as_log_value(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Whether any entry, from this run or an earlier one, carries this
    /// fingerprint. Always false for an unavailable fingerprint.
    pub fn exists_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let Some(digest) = fingerprint.digest() else {
            return Ok(false);
        };

        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM actions WHERE checksum = ? LIMIT 1",
                [digest],
                |_| Ok(()),
            )
            .optional()?;

        Ok(found.is_some())
    }

    /// Number of entries of one kind
    pub fn count_by_action(&self, action: ActionKind) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM actions WHERE action = ?",
            [action.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// All entries in insertion order
    pub fn records(&self) -> Result<Vec<ActionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, action, src, dst, checksum FROM actions ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, timestamp, action, src, dst, checksum) = row?;
            records.push(ActionRecord {
                id,
                timestamp: timestamp.unwrap_or_default(),
                action: action.unwrap_or_default().parse()?,
                src: PathBuf::from(src.unwrap_or_default()),
                dst: PathBuf::from(dst.unwrap_or_default()),
                checksum: checksum.unwrap_or_default(),
            });
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::UNAVAILABLE_MARKER;
    use tempfile::tempdir;

    fn digest(c: char) -> Fingerprint {
        Fingerprint::Digest(c.to_string().repeat(64))
    }

    #[test]
    fn test_action_kind_round_trip_names() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
        assert_eq!(ActionKind::DuplicateSeen.to_string(), "duplicate_seen");
        assert!("moved".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_record_and_lookup() {
        let log = ActionLog::open_in_memory().unwrap();
        let fp = digest('a');

        assert!(!log.exists_by_fingerprint(&fp).unwrap());

        let id = log
            .record(ActionKind::Copy, Path::new("/src/a.jpg"), Path::new("/dst/2024/01/a.jpg"), &fp)
            .unwrap();
        assert_eq!(id, 1);

        assert!(log.exists_by_fingerprint(&fp).unwrap());
        assert!(!log.exists_by_fingerprint(&digest('b')).unwrap());

        let records = log.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, ActionKind::Copy);
        assert_eq!(records[0].src, PathBuf::from("/src/a.jpg"));
        assert_eq!(records[0].checksum, fp.as_log_value());
        // 2024-01-15T14:30:00
        assert_eq!(records[0].timestamp.len(), 19);
        assert_eq!(&records[0].timestamp[10..11], "T");
    }

    #[test]
    fn test_unavailable_fingerprint_never_exists() {
        let log = ActionLog::open_in_memory().unwrap();
        log.record(
            ActionKind::Copy,
            Path::new("/src/broken.jpg"),
            Path::new("/dst/broken.jpg"),
            &Fingerprint::Unavailable,
        )
        .unwrap();

        assert!(!log.exists_by_fingerprint(&Fingerprint::Unavailable).unwrap());
        assert_eq!(log.records().unwrap()[0].checksum, UNAVAILABLE_MARKER);
    }

    #[test]
    fn test_count_by_action() {
        let log = ActionLog::open_in_memory().unwrap();
        let src = Path::new("/src/a.jpg");
        let dst = Path::new("/dst/a.jpg");
        log.record(ActionKind::Copy, src, dst, &digest('a')).unwrap();
        log.record(ActionKind::DuplicateSeen, src, dst, &digest('a')).unwrap();
        log.record(ActionKind::DuplicateSeen, src, dst, &digest('a')).unwrap();

        assert_eq!(log.count_by_action(ActionKind::Copy).unwrap(), 1);
        assert_eq!(log.count_by_action(ActionKind::DuplicateSeen).unwrap(), 2);
        assert_eq!(log.count_by_action(ActionKind::DryRun).unwrap(), 0);
    }

    #[test]
    fn test_persists_across_handles() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("nested").join("log").join("actions.sqlite3");

        {
            let log = ActionLog::open(&db).unwrap();
            log.record(ActionKind::Copy, Path::new("/a"), Path::new("/b"), &digest('c'))
                .unwrap();
        }
        assert!(db.exists());

        let log = ActionLog::open(&db).unwrap();
        assert_eq!(log.path(), db.as_path());
        assert!(log.exists_by_fingerprint(&digest('c')).unwrap());
        let id = log
            .record(ActionKind::DuplicateSeen, Path::new("/a"), Path::new("/b"), &digest('c'))
            .unwrap();
        assert_eq!(id, 2);
    }

    #[test]
    fn test_checksum_index_exists() {
        let log = ActionLog::open_in_memory().unwrap();
        let name: String = log
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'actions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(name, "idx_checksum");
    }
}
