use rusqlite::Connection;
use std::path::Path;
use tokio::task;
use crate::error::{Result, SchemascopeError};

/// Database connection wrapper
pub struct Db {
    path: std::path::PathBuf,
}

/// Single-slot snapshot table. `id` is pinned to 1.
const SNAPSHOT_TABLE: &str = "CREATE TABLE IF NOT EXISTS aggregate_snapshot ( \
    id INTEGER PRIMARY KEY CHECK (id = 1), \
    body TEXT NOT NULL, \
    saved_at TEXT NOT NULL \
);";

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Execute a closure with a database connection in a blocking task
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = open(&path)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            SchemascopeError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Database task failed: {}", e),
            ))
        })?
    }
}

/// Open a connection with pragmas set and the snapshot table in place
fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(SchemascopeError::Database)?;

    // WAL so readers never block on the snapshot writer
    conn.execute_batch(
        "PRAGMA journal_mode = WAL; \
         PRAGMA synchronous = NORMAL; \
         PRAGMA busy_timeout = 5000;",
    )?;
    conn.execute_batch(SNAPSHOT_TABLE)?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_db_connection_creates_table() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Db::new(&db_path);

        let exists = db
            .with_connection(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name='aggregate_snapshot'",
                )?;
                Ok(stmt.exists([])?)
            })
            .await
            .unwrap();

        assert!(exists);
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_pragmas_set() {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("test.db"));

        db.with_connection(|conn| {
            let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
            assert_eq!(journal_mode.to_uppercase(), "WAL");
            Ok::<(), SchemascopeError>(())
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_table_is_single_slot() {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("test.db"));

        let result = db
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO aggregate_snapshot (id, body, saved_at) VALUES (2, '{}', 'now')",
                    [],
                )?;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(SchemascopeError::Database(_))));
    }
}
