pub mod error;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod users;

pub use error::{DbError, Result};

use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_READER_POOL_SIZE: usize = 4;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared storage handle: one writer connection plus a round-robin pool of
/// read-only connections. WAL mode lets readers run alongside the writer.
///
/// Open once at startup and share it behind an `Arc`; dropping it closes
/// every connection.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_readers(path, DEFAULT_READER_POOL_SIZE)
    }

    pub fn open_with_readers(path: &Path, reader_pool_size: usize) -> Result<Self> {
        let writer = Connection::open(path)?;
        let mode: String =
            writer.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run(&writer)?;

        let pool_size = reader_pool_size.max(1);
        let mut readers = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (journal_mode={}, 1 writer + {} readers)",
            path.display(),
            mode,
            pool_size
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// Run a read-only closure on the next reader connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| DbError::LockPoisoned(format!("reader: {}", e)))?;
        f(&conn)
    }

    /// Run a closure on the writer connection. Writers are serialized.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| DbError::LockPoisoned(format!("writer: {}", e)))?;
        f(&conn)
    }
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reopen_keeps_schema_and_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reopen.db");

        {
            let db = Database::open(&path).unwrap();
            db.with_conn_mut(|conn| {
                conn.execute(
                    "INSERT INTO users (id, username, credential, created_at)
                     VALUES ('u1', 'alice', 'x', '2026-01-01T00:00:00.000000Z')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn readers_are_read_only() {
        let (_dir, db) = test_support::open_temp();
        let result = db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, credential, created_at)
                 VALUES ('u1', 'alice', 'x', 'now')",
                [],
            )?;
            Ok(())
        });
        assert!(matches!(result, Err(DbError::Sqlite(_))));
    }
}
