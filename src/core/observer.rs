//! Observability hook for the session protocol.
//!
//! Every protocol step is reported as a [`SessionEvent`]. The default
//! [`TracingObserver`] turns events into `tracing` records; embedders that
//! want metrics or audit trails implement [`SessionObserver`] themselves.

use std::sync::Mutex;

use serde::Serialize;

/// One step of the read/write/destroy/gc protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A read finished. `found` is false when no record existed.
    Read {
        id: String,
        found: bool,
        bytes: usize,
    },
    /// A reader found the record locked and slept one interval.
    LockWait { id: String, waited_secs: u64 },
    /// The reader set the lock flag.
    LockAcquired { id: String, waited_secs: u64 },
    /// The wait hit the timeout with the lock still held.
    LockTimeout {
        id: String,
        waited_secs: u64,
        proceeding: bool,
    },
    /// A write replaced the payload and released the lock.
    Write { id: String, bytes: usize },
    /// A destroy ran. `removed` is false when no row matched.
    Destroy { id: String, removed: bool },
    /// Expired records were purged.
    GarbageCollect {
        max_lifetime_secs: u64,
        removed: u64,
    },
}

/// Receiver for protocol events.
pub trait SessionObserver: Send + Sync {
    /// Called synchronously on the caller's thread.
    fn on_event(&self, event: &SessionEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Read { id, found, bytes } => {
                tracing::debug!(session_id = %id, found, bytes, "session read");
            }
            SessionEvent::LockWait { id, waited_secs } => {
                tracing::debug!(session_id = %id, waited_secs, "session locked, waiting");
            }
            SessionEvent::LockAcquired { id, waited_secs } => {
                tracing::debug!(session_id = %id, waited_secs, "session lock set");
            }
            SessionEvent::LockTimeout {
                id,
                waited_secs,
                proceeding,
            } => {
                tracing::warn!(
                    session_id = %id,
                    waited_secs,
                    proceeding,
                    "session lock still held after timeout"
                );
            }
            SessionEvent::Write { id, bytes } => {
                tracing::debug!(session_id = %id, bytes, "session written");
            }
            SessionEvent::Destroy { id, removed } => {
                tracing::debug!(session_id = %id, removed, "session destroyed");
            }
            SessionEvent::GarbageCollect {
                max_lifetime_secs,
                removed,
            } => {
                tracing::info!(max_lifetime_secs, removed, "expired sessions removed");
            }
        }
    }
}

/// Collects events in memory, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Count of recorded `LockWait` events.
    pub fn lock_waits(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SessionEvent::LockWait { .. }))
            .count()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_event(&self, event: &SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        observer.on_event(&SessionEvent::Write {
            id: "a".to_string(),
            bytes: 3,
        });
        observer.on_event(&SessionEvent::LockWait {
            id: "a".to_string(),
            waited_secs: 1,
        });

        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SessionEvent::Write { .. }));
        assert_eq!(observer.lock_waits(), 1);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = SessionEvent::Destroy {
            id: "abc".to_string(),
            removed: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "destroy");
        assert_eq!(json["id"], "abc");
        assert_eq!(json["removed"], true);
    }

    #[test]
    fn test_tracing_observer_accepts_every_event() {
        let observer = TracingObserver;
        let id = "s".to_string();
        for event in [
            SessionEvent::Read {
                id: id.clone(),
                found: false,
                bytes: 0,
            },
            SessionEvent::LockTimeout {
                id: id.clone(),
                waited_secs: 15,
                proceeding: true,
            },
            SessionEvent::GarbageCollect {
                max_lifetime_secs: 60,
                removed: 2,
            },
        ] {
            observer.on_event(&event);
        }
    }
}
