//! SQLite persistence.
//!
//! One [`Store`] is opened at startup and handed to every consumer. The
//! repository functions in [`substations`] and [`measurements`] take a plain
//! `&Connection`, so they compose inside a single transaction.

pub mod measurements;
mod schema;
pub mod substations;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use tracing::debug;

use crate::error::{GarduError, Result};

pub use schema::SCHEMA_VERSION;

/// Process-wide database handle.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (or creates) the database at `path` and applies the schema.
    ///
    /// `":memory:"` opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`GarduError::Storage`] if the file cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = if path.as_os_str() == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        debug!(path = %path.display(), "opened database");
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database with the schema applied.
    ///
    /// # Errors
    ///
    /// Returns [`GarduError::Storage`] if migration fails.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| GarduError::Internal("database handle poisoned".into()))
    }

    /// Runs a read-only closure against the connection.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Runs a closure inside a transaction, committing only if it returns `Ok`.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error; the transaction is rolled back.
    pub fn write<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

/// Current time as an RFC 3339 UTC timestamp, second precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
