//! SQLite database module
//!
//! ## Tables
//!
//! - `users` - Accounts and their password hashes
//! - `documents` - Uploaded file blobs grouped by parent id

pub mod files;
pub mod schema;
pub mod users;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::types::StoreError;

pub use files::{FileMeta, NewFile, StoredFile};

/// SQLite database for accounts and files
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database file (":memory:" opens an in-memory database)
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if path.as_os_str() == ":memory:" {
            return Self::open_in_memory();
        }

        info!("Opening SQLite database at {:?}", path);

        let conn = Connection::open(path)
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {}", e)))?;

        // WAL for concurrent readers while a write is in progress
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| StoreError::Storage(format!("Failed to set PRAGMA: {}", e)))?;

        Self::init(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory().map_err(|e| {
            StoreError::Storage(format!("Failed to open in-memory SQLite: {}", e))
        })?;

        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a closure with the locked connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Storage(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Check the database answers queries
    pub fn ping(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_and_ping() {
        let db = Database::open_in_memory().unwrap();
        db.ping().unwrap();
    }

    #[test]
    fn test_memory_path_alias() {
        let db = Database::open(Path::new(":memory:")).unwrap();
        db.ping().unwrap();
    }
}
