//! SQLite datastore.
//!
//! Sessions live in one table of a SQLite database. The connection is
//! opened on the first query, not at construction, and belongs to this
//! datastore alone. Processes sharing the database file coordinate only
//! through SQLite's own statement-level locking.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::config::Config;
use crate::core::record::{from_millis, to_millis};
use crate::core::SessionRecord;
use crate::error::{Result, SessionError};
use crate::storage::Datastore;

/// How long a statement waits on another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory database name understood by SQLite.
pub const MEMORY_DATABASE: &str = ":memory:";

/// SQLite-backed session table.
pub struct SqliteDatastore {
    config: Arc<Config>,
    conn: Mutex<Option<Connection>>,
}

impl SqliteDatastore {
    /// Create a datastore for the database and table in `config`.
    ///
    /// No connection is made until the first query.
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            conn: Mutex::new(None),
        }
    }

    /// Name of the session table.
    pub fn table(&self) -> &str {
        &self.config.database.table
    }

    /// Table name as a quoted SQL identifier.
    ///
    /// Word-character names may still be keywords (`order`) or start with
    /// a digit, so every statement uses the quoted form.
    fn quoted_table(&self) -> String {
        format!("\"{}\"", self.table())
    }

    /// Whether the lazy connection has been opened.
    pub fn is_connected(&self) -> bool {
        self.conn.lock().map(|c| c.is_some()).unwrap_or(false)
    }

    /// Open the connection if needed and create the table if missing.
    pub fn ensure_schema(&self) -> Result<()> {
        self.with_conn(|_, _| Ok(()))
    }

    fn connect(&self) -> Result<Connection> {
        self.config.validate()?;
        let db = &self.config.database;

        let conn = if db.name == MEMORY_DATABASE {
            Connection::open_in_memory()?
        } else {
            Connection::open(&db.name)?
        };
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let table = self.quoted_table();
        let create = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id       TEXT PRIMARY KEY NOT NULL,
                modified INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER) * 1000),
                data     BLOB,
                locked   INTEGER NOT NULL DEFAULT 0
            )"
        );
        tracing::trace!(table = %table, sql = %create, "executing");
        conn.execute(&create, [])?;

        tracing::debug!(database = %db.name, table = %table, "sqlite connection opened");
        Ok(conn)
    }

    /// Run `f` with the connection, opening it on first use.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection, &str) -> Result<T>) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| SessionError::backend("sqlite connection lock poisoned"))?;
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        match guard.as_ref() {
            Some(conn) => f(conn, &self.quoted_table()),
            None => Err(SessionError::backend("sqlite connection unavailable")),
        }
    }
}

impl std::fmt::Debug for SqliteDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatastore")
            .field("database", &self.config.database.name)
            .field("table", &self.table())
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Datastore for SqliteDatastore {
    fn fetch(&self, id: &str) -> Result<Option<SessionRecord>> {
        self.with_conn(|conn, table| {
            let sql = format!("SELECT id, data, locked, modified FROM {table} WHERE id = ?1");
            tracing::trace!(sql = %sql, session_id = %id, "executing");
            let record = conn
                .query_row(&sql, params![id], |row| {
                    let data: Option<Vec<u8>> = row.get(1)?;
                    let locked: i64 = row.get(2)?;
                    let modified: i64 = row.get(3)?;
                    Ok(SessionRecord {
                        id: row.get(0)?,
                        data: data.unwrap_or_default(),
                        locked: locked != 0,
                        modified: from_millis(modified),
                    })
                })
                .optional()?;
            Ok(record)
        })
    }

    fn upsert(&self, id: &str, data: &[u8], modified: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn, table| {
            let sql = format!(
                "INSERT INTO {table} (id, data, locked, modified) VALUES (?1, ?2, 0, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                   data = excluded.data,
                   locked = 0,
                   modified = MAX({table}.modified, excluded.modified)"
            );
            tracing::trace!(sql = %sql, session_id = %id, bytes = data.len(), "executing");
            conn.execute(&sql, params![id, data, to_millis(modified)])?;
            Ok(())
        })
    }

    fn set_locked(&self, id: &str) -> Result<()> {
        self.with_conn(|conn, table| {
            let sql = format!("UPDATE {table} SET locked = 1 WHERE id = ?1");
            tracing::trace!(sql = %sql, session_id = %id, "executing");
            conn.execute(&sql, params![id])?;
            Ok(())
        })
    }

    fn try_lock(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn, table| {
            let sql = format!("UPDATE {table} SET locked = 1 WHERE id = ?1 AND locked = 0");
            tracing::trace!(sql = %sql, session_id = %id, "executing");
            Ok(conn.execute(&sql, params![id])? == 1)
        })
    }

    fn delete(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn, table| {
            let sql = format!("DELETE FROM {table} WHERE id = ?1");
            tracing::trace!(sql = %sql, session_id = %id, "executing");
            Ok(conn.execute(&sql, params![id])? > 0)
        })
    }

    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.with_conn(|conn, table| {
            let sql = format!("DELETE FROM {table} WHERE modified < ?1");
            tracing::trace!(sql = %sql, cutoff = %cutoff, "executing");
            Ok(conn.execute(&sql, params![to_millis(cutoff)])? as u64)
        })
    }
}
