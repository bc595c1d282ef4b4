//! In-memory datastore.
//!
//! A thread-safe implementation of the [`Datastore`] trait, used by the
//! test suite and by embedders that only need sessions inside one process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::core::SessionRecord;
use crate::error::{Result, SessionError};
use crate::storage::Datastore;

/// In-memory session table.
///
/// Thread-safe implementation using `RwLock<HashMap>`. Each trait method
/// holds the lock for its whole body, matching the per-statement atomicity
/// of a SQL datastore.
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    /// Session rows keyed by id.
    records: RwLock<HashMap<String, SessionRecord>>,
    /// Number of trait calls served.
    calls: AtomicUsize,
}

impl MemoryDatastore {
    /// Create a new empty datastore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of records.
    pub fn len(&self) -> usize {
        self.read_guard().map(|r| r.len()).unwrap_or(0)
    }

    /// Check if the datastore is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every record.
    pub fn clear(&self) {
        if let Ok(mut records) = self.write_guard() {
            records.clear();
        }
    }

    /// Number of [`Datastore`] calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Insert a record as-is, bypassing the upsert rules.
    pub fn insert_raw(&self, record: SessionRecord) -> Result<()> {
        self.write_guard()?.insert(record.id.clone(), record);
        Ok(())
    }

    /// Clear the lock flag without touching data or `modified`.
    ///
    /// Simulates a holder that releases its lock out of band.
    pub fn unlock(&self, id: &str) -> Result<()> {
        if let Some(record) = self.write_guard()?.get_mut(id) {
            record.locked = false;
        }
        Ok(())
    }

    fn read_guard(&self) -> Result<RwLockReadGuard<'_, HashMap<String, SessionRecord>>> {
        self.records
            .read()
            .map_err(|_| SessionError::backend("memory datastore lock poisoned"))
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, SessionRecord>>> {
        self.records
            .write()
            .map_err(|_| SessionError::backend("memory datastore lock poisoned"))
    }

    fn count_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Datastore for MemoryDatastore {
    fn fetch(&self, id: &str) -> Result<Option<SessionRecord>> {
        self.count_call();
        Ok(self.read_guard()?.get(id).cloned())
    }

    fn upsert(&self, id: &str, data: &[u8], modified: DateTime<Utc>) -> Result<()> {
        self.count_call();
        let mut records = self.write_guard()?;
        records
            .entry(id.to_string())
            .and_modify(|r| r.overwrite(data, modified))
            .or_insert_with(|| SessionRecord::new(id, data, modified));
        Ok(())
    }

    fn set_locked(&self, id: &str) -> Result<()> {
        self.count_call();
        if let Some(record) = self.write_guard()?.get_mut(id) {
            record.locked = true;
        }
        Ok(())
    }

    fn try_lock(&self, id: &str) -> Result<bool> {
        self.count_call();
        match self.write_guard()?.get_mut(id) {
            Some(record) if !record.locked => {
                record.locked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delete(&self, id: &str) -> Result<bool> {
        self.count_call();
        Ok(self.write_guard()?.remove(id).is_some())
    }

    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.count_call();
        let mut records = self.write_guard()?;
        let before = records.len();
        records.retain(|_, r| !r.is_expired(cutoff));
        Ok((before - records.len()) as u64)
    }
}
