//! Repository layer for persisting records and revision history to SQLite
//!
//! [`SqliteStore`] implements both core storage traits over one connection.

mod rows;
pub mod sqlite_store;

pub use sqlite_store::SqliteStore;
