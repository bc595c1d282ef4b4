//! The session store: open / close / read / write / destroy / gc.
//!
//! [`SessionStore`] runs the lock protocol over a [`Datastore`]:
//!
//! ```text
//! UNLOCKED --read--> LOCKED --write--> UNLOCKED
//! ```
//!
//! A reader that finds the record locked polls until the flag clears or the
//! timeout elapses. With the default `proceed` policy it then reads anyway
//! and leaves the stale flag in place, so two readers can both proceed and
//! the later write wins. The lock is advisory: callers that skip `read`
//! can write at any time.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::{positive, Config, TimeoutPolicy};
use crate::core::clock::{Clock, SystemClock};
use crate::core::lock::{LockOutcome, LockWaiter};
use crate::core::observer::{SessionEvent, SessionObserver, TracingObserver};
use crate::core::record::SessionRecord;
use crate::core::validate::validate_session_id;
use crate::error::{Result, SessionError};
use crate::storage::{Datastore, SqliteDatastore};

/// The operations a host application drives a session backend with.
pub trait SessionHandler: Send + Sync {
    /// Prepare for a request. Always succeeds; nothing is connected yet.
    fn open(&self, save_path: &str, name: &str) -> Result<()>;

    /// Finish a request. Always succeeds.
    fn close(&self) -> Result<()>;

    /// Return the session payload, or empty data for an unknown id.
    fn read(&self, id: &str) -> Result<Vec<u8>>;

    /// Store the payload and release the lock.
    fn write(&self, id: &str, data: &[u8]) -> Result<()>;

    /// Delete the session. Returns whether a row was removed.
    fn destroy(&self, id: &str) -> Result<bool>;

    /// Delete sessions not written for more than `max_lifetime_secs`.
    /// Returns how many were removed.
    fn gc(&self, max_lifetime_secs: i64) -> Result<u64>;
}

impl<T: SessionHandler + ?Sized> SessionHandler for Arc<T> {
    fn open(&self, save_path: &str, name: &str) -> Result<()> {
        (**self).open(save_path, name)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }

    fn read(&self, id: &str) -> Result<Vec<u8>> {
        (**self).read(id)
    }

    fn write(&self, id: &str, data: &[u8]) -> Result<()> {
        (**self).write(id, data)
    }

    fn destroy(&self, id: &str) -> Result<bool> {
        (**self).destroy(id)
    }

    fn gc(&self, max_lifetime_secs: i64) -> Result<u64> {
        (**self).gc(max_lifetime_secs)
    }
}

/// Session store over a datastore, a clock and an observer.
pub struct SessionStore<D, C = SystemClock> {
    config: Arc<Config>,
    datastore: D,
    clock: C,
    observer: Arc<dyn SessionObserver>,
}

impl<D: Datastore> SessionStore<D, SystemClock> {
    /// Create a store using the wall clock.
    pub fn new(config: Arc<Config>, datastore: D) -> Self {
        Self::with_clock(config, datastore, SystemClock)
    }
}

impl SessionStore<SqliteDatastore, SystemClock> {
    /// Create a store backed by the SQLite database named in `config`.
    pub fn sqlite(config: Arc<Config>) -> Self {
        let datastore = SqliteDatastore::new(Arc::clone(&config));
        Self::new(config, datastore)
    }
}

impl<D: Datastore, C: Clock> SessionStore<D, C> {
    /// Create a store with an explicit clock.
    pub fn with_clock(config: Arc<Config>, datastore: D, clock: C) -> Self {
        Self {
            config,
            datastore,
            clock,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the observer.
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The shared configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying datastore.
    pub fn datastore(&self) -> &D {
        &self.datastore
    }

    fn emit(&self, event: SessionEvent) {
        self.observer.on_event(&event);
    }

    fn check(&self, id: &str) -> Result<()> {
        self.config.validate()?;
        validate_session_id(id)
    }

    fn finish_read(&self, id: &str, data: Vec<u8>, found: bool) -> Result<Vec<u8>> {
        self.emit(SessionEvent::Read {
            id: id.to_string(),
            found,
            bytes: data.len(),
        });
        Ok(data)
    }

    fn read_locked(&self, id: &str, record: SessionRecord) -> Result<Vec<u8>> {
        let locking = &self.config.locking;
        let waiter = LockWaiter::new(&self.datastore, &self.clock, locking, &*self.observer);

        let data = match waiter.wait(id, record)? {
            LockOutcome::Missing => return self.finish_read(id, Vec::new(), false),
            LockOutcome::Free {
                record,
                waited_secs,
                acquired,
            } => {
                let record = if acquired {
                    // Re-read under the lock; the row may have changed since the fetch.
                    match self.datastore.fetch(id)? {
                        Some(r) => r,
                        None => return self.finish_read(id, Vec::new(), false),
                    }
                } else {
                    self.datastore.set_locked(id)?;
                    record
                };
                self.emit(SessionEvent::LockAcquired {
                    id: id.to_string(),
                    waited_secs,
                });
                record.data
            }
            LockOutcome::TimedOut {
                record,
                waited_secs,
            } => {
                let proceeding = locking.on_timeout == TimeoutPolicy::Proceed;
                self.emit(SessionEvent::LockTimeout {
                    id: id.to_string(),
                    waited_secs,
                    proceeding,
                });
                if !proceeding {
                    return Err(SessionError::lock_timeout(id, waited_secs));
                }
                self.datastore.set_locked(id)?;
                record.data
            }
        };

        self.finish_read(id, data, true)
    }

    /// Oldest `modified` that survives a GC with this lifetime.
    fn cutoff(&self, max_lifetime_secs: u64) -> DateTime<Utc> {
        let now = self.clock.now();
        i64::try_from(max_lifetime_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_sub_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl<D: Datastore, C: Clock> SessionHandler for SessionStore<D, C> {
    fn open(&self, _save_path: &str, _name: &str) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn read(&self, id: &str) -> Result<Vec<u8>> {
        self.check(id)?;

        let Some(record) = self.datastore.fetch(id)? else {
            return self.finish_read(id, Vec::new(), false);
        };

        if !self.config.locking.enabled {
            return self.finish_read(id, record.data, true);
        }
        self.read_locked(id, record)
    }

    fn write(&self, id: &str, data: &[u8]) -> Result<()> {
        self.check(id)?;
        self.datastore.upsert(id, data, self.clock.now())?;
        self.emit(SessionEvent::Write {
            id: id.to_string(),
            bytes: data.len(),
        });
        Ok(())
    }

    fn destroy(&self, id: &str) -> Result<bool> {
        self.check(id)?;
        let removed = self.datastore.delete(id)?;
        self.emit(SessionEvent::Destroy {
            id: id.to_string(),
            removed,
        });
        Ok(removed)
    }

    fn gc(&self, max_lifetime_secs: i64) -> Result<u64> {
        self.config.validate()?;
        let lifetime = positive("max_lifetime", max_lifetime_secs)?;
        let removed = self.datastore.delete_older_than(self.cutoff(lifetime))?;
        self.emit(SessionEvent::GarbageCollect {
            max_lifetime_secs: lifetime,
            removed,
        });
        Ok(removed)
    }
}
