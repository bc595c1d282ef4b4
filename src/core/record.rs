//! Session row type.
//!
//! A [`SessionRecord`] mirrors one row of the session table: the opaque
//! payload, the advisory lock flag and the last-write timestamp.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One persisted session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    /// Session identifier (word characters only).
    pub id: String,
    /// Serialized session payload. Never interpreted by the store.
    pub data: Vec<u8>,
    /// Whether a reader currently holds the record.
    pub locked: bool,
    /// When the record was last written.
    pub modified: DateTime<Utc>,
}

impl SessionRecord {
    /// Create an unlocked record.
    pub fn new(id: impl Into<String>, data: impl Into<Vec<u8>>, modified: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
            locked: false,
            modified,
        }
    }

    /// Whether the record was last written strictly before `cutoff`.
    pub fn is_expired(&self, cutoff: DateTime<Utc>) -> bool {
        self.modified < cutoff
    }

    /// Replace the payload, clear the lock and refresh `modified`.
    ///
    /// `modified` never moves backwards.
    pub fn overwrite(&mut self, data: &[u8], modified: DateTime<Utc>) {
        self.data = data.to_vec();
        self.locked = false;
        if modified > self.modified {
            self.modified = modified;
        }
    }
}

/// Convert a timestamp to the millisecond column representation.
pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Convert the millisecond column representation back to a timestamp.
///
/// Out-of-range values clamp to the Unix epoch.
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
