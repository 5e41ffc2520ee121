use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Default database location, relative to the working directory
pub const DEFAULT_DB_PATH: &str = "./excel_data.db";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to acquire database lock")]
    Lock,
}

/// Storage handle shared by the initial pass and the watch loop.
///
/// Every statement goes through the connection mutex, so two passes can
/// never interleave their writes.
pub struct Database {
    pub(crate) conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (and create if absent) the database file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref();

        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path)?;
            log::info!("DB file created: {}", path.display());
        }

        let conn = Connection::open(path)?;
        log::info!("DB initialized: {}", path.display());

        Ok(Database {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Ok(Database {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// File backing this database, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the underlying connection, reporting any pending error
    pub fn close(self) -> Result<(), DbError> {
        let conn = self.conn.into_inner().map_err(|_| DbError::Lock)?;
        conn.close().map_err(|(_, e)| DbError::Sqlite(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("excel_data.db");
        assert!(!path.exists());

        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), Some(path.as_path()));
        db.close().unwrap();
    }

    #[test]
    fn test_in_memory_has_no_path() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.path().is_none());
    }
}
