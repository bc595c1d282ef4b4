//! Polling wait on the advisory lock flag.
//!
//! [`LockWaiter`] implements the read-side wait: while the record is locked
//! and the elapsed wait is below the timeout, sleep one interval and fetch
//! again. Elapsed time is counted in whole intervals, so a wait never
//! exceeds `ceil(timeout / sleep) * sleep` seconds.

use crate::config::{LockMode, LockingConfig};
use crate::core::clock::Clock;
use crate::core::observer::{SessionEvent, SessionObserver};
use crate::core::SessionRecord;
use crate::error::Result;
use crate::storage::Datastore;

/// Result of waiting for a session lock.
#[derive(Debug, Clone, PartialEq)]
pub enum LockOutcome {
    /// The record disappeared while waiting.
    Missing,
    /// The lock is free.
    ///
    /// In atomic mode `acquired` is true and the flag has already been set
    /// by this caller; `record` may predate the acquisition.
    Free {
        record: SessionRecord,
        waited_secs: u64,
        acquired: bool,
    },
    /// The lock was still held when the timeout elapsed.
    TimedOut {
        record: SessionRecord,
        waited_secs: u64,
    },
}

/// Polls one record until its lock clears or the timeout elapses.
pub struct LockWaiter<'a, D: ?Sized, C: ?Sized> {
    datastore: &'a D,
    clock: &'a C,
    locking: &'a LockingConfig,
    observer: &'a dyn SessionObserver,
}

impl<'a, D, C> LockWaiter<'a, D, C>
where
    D: Datastore + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(
        datastore: &'a D,
        clock: &'a C,
        locking: &'a LockingConfig,
        observer: &'a dyn SessionObserver,
    ) -> Self {
        Self {
            datastore,
            clock,
            locking,
            observer,
        }
    }

    /// Wait on `record`, which the caller has just fetched.
    pub fn wait(&self, id: &str, record: SessionRecord) -> Result<LockOutcome> {
        self.locking.validate()?;
        let sleep_secs = self.locking.sleep_secs();
        let timeout_secs = self.locking.timeout_secs();
        let atomic = self.locking.mode == LockMode::Atomic;

        let mut record = record;
        let mut waited_secs = 0u64;

        loop {
            let held = if atomic {
                !self.datastore.try_lock(id)?
            } else {
                record.locked
            };

            if !held {
                return Ok(LockOutcome::Free {
                    record,
                    waited_secs,
                    acquired: atomic,
                });
            }
            if waited_secs >= timeout_secs {
                return Ok(LockOutcome::TimedOut {
                    record,
                    waited_secs,
                });
            }

            self.clock.sleep(self.locking.sleep());
            waited_secs += sleep_secs;
            self.observer.on_event(&SessionEvent::LockWait {
                id: id.to_string(),
                waited_secs,
            });

            record = match self.datastore.fetch(id)? {
                Some(r) => r,
                None => return Ok(LockOutcome::Missing),
            };
        }
    }
}
