//! sessiondb - SQL-backed session storage
//!
//! sessiondb stores web-session payloads in a single SQL table and
//! serializes concurrent requests for the same session with an advisory
//! per-session lock: `read` marks the session locked, `write` clears it,
//! and a reader that finds the lock held polls until it clears or the
//! configured timeout elapses.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sessiondb::{Config, SessionHandler, SessionStore};
//!
//! # fn main() -> sessiondb::Result<()> {
//! let config = Arc::new(Config::load()?);
//! let store = SessionStore::sqlite(config);
//!
//! let data = store.read("abc123")?;
//! store.write("abc123", &data)?;
//! store.gc(1440)?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;

pub use config::{Config, DatabaseConfig, LockMode, LockingConfig, TimeoutPolicy};
pub use core::{
    Clock, LockOutcome, ManualClock, RecordingObserver, SessionEvent, SessionHandler,
    SessionObserver, SessionRecord, SessionStore, SystemClock, TracingObserver,
};
pub use error::{Result, SessionError};
pub use storage::{Datastore, MemoryDatastore, SqliteDatastore};

// CLI commands
pub use cli::{GcCommand, InitCommand, SessionCommand};
