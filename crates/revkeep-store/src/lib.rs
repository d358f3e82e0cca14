//! revkeep Store - SQLite persistence for live records and revision history
//!
//! Provides:
//! - SQLite schema with a checksummed migrations framework
//! - [`SqliteStore`], implementing the core `RecordStore` and `VersionStore`
//!   traits over one connection

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use errors::Result;
pub use repo::SqliteStore;
