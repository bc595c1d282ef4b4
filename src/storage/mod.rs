//! Datastores for sessiondb.
//!
//! This module provides the [`Datastore`] trait and its SQLite and
//! in-memory implementations.

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::MemoryDatastore;
pub use sqlite::SqliteDatastore;
pub use traits::Datastore;
