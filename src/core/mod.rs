//! Core types and logic for sessiondb.
//!
//! This module contains the session record, identifier validation, the
//! lock-wait loop and the [`SessionStore`] that ties them to a datastore.

pub mod clock;
pub mod lock;
pub mod observer;
pub mod record;
pub mod store;
pub mod validate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use lock::{LockOutcome, LockWaiter};
pub use observer::{RecordingObserver, SessionEvent, SessionObserver, TracingObserver};
pub use record::SessionRecord;
pub use store::{SessionHandler, SessionStore};
pub use validate::{is_word, validate_session_id, validate_table_name};
