//! Datastore trait for sessiondb.
//!
//! A [`Datastore`] owns the session table. Every method is one statement
//! against it; the store composes them into the lock protocol and assumes
//! only per-statement atomicity.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::SessionRecord;
use crate::error::Result;

/// Trait for session table backends.
pub trait Datastore: Send + Sync {
    /// Fetch one record by id.
    ///
    /// Returns `Ok(None)` if no row exists.
    fn fetch(&self, id: &str) -> Result<Option<SessionRecord>>;

    /// Insert or update a record.
    ///
    /// A new row is inserted unlocked. An existing row gets the new data,
    /// a cleared lock flag and `modified`, unless the stored timestamp is
    /// already later.
    fn upsert(&self, id: &str, data: &[u8], modified: DateTime<Utc>) -> Result<()>;

    /// Set the lock flag unconditionally. Missing rows are ignored.
    fn set_locked(&self, id: &str) -> Result<()>;

    /// Set the lock flag only if it is currently clear.
    ///
    /// Returns `true` when this call took the lock.
    fn try_lock(&self, id: &str) -> Result<bool>;

    /// Delete a record.
    ///
    /// Returns `true` if a row was removed.
    fn delete(&self, id: &str) -> Result<bool>;

    /// Delete every record whose `modified` is strictly before `cutoff`.
    ///
    /// Returns the number of rows removed.
    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Blanket implementation of Datastore for Arc-wrapped datastores.
///
/// Lets several stores, or a store and a test, share one datastore.
impl<T: Datastore + ?Sized> Datastore for Arc<T> {
    fn fetch(&self, id: &str) -> Result<Option<SessionRecord>> {
        (**self).fetch(id)
    }

    fn upsert(&self, id: &str, data: &[u8], modified: DateTime<Utc>) -> Result<()> {
        (**self).upsert(id, data, modified)
    }

    fn set_locked(&self, id: &str) -> Result<()> {
        (**self).set_locked(id)
    }

    fn try_lock(&self, id: &str) -> Result<bool> {
        (**self).try_lock(id)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        (**self).delete(id)
    }

    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        (**self).delete_older_than(cutoff)
    }
}
