//! revkeep Core - transactional object versioning engine
//!
//! This crate records the history of application records as immutable
//! snapshots, including:
//! - A record catalog and type registry describing what is versioned
//! - Revision scopes that collect touched objects and commit them atomically
//! - Relationship closure over followed references
//! - JSON/YAML snapshot encoding of composite entities
//! - Field-level diffs over history windows with a text rendering
//! - Revert of a revision back into the live store
//!
//! Storage is reached only through the [`store::RecordStore`] and
//! [`store::VersionStore`] traits; an in-memory backend lives here, the
//! SQLite backend in `revkeep-store`.

pub mod closure;
pub mod codec;
pub mod commit;
pub mod config;
pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod queries;
pub mod registry;
pub mod revert;
pub mod store;
pub mod tracker;

pub use revkeep_core_types::schema;
pub use revkeep_core_types::{ObjectKey, ObjectRef, RevisionId, TypeName, VersionId};

// Re-export commonly used types
pub use closure::{follow_relationships, ClosureSet, FollowOptions};
pub use codec::Format;
pub use config::SchemaConfig;
pub use diff::{diff_version, field_diff, history_diff, render_history, HistoryDiff};
pub use errors::{ExError, ExErrorKind, Result, RevkeepError};
pub use model::{Action, Catalog, FieldKind, FieldValue, Record, Revision, TypeSchema, Version};
pub use registry::{RegisterOptions, Registry};
pub use revert::{revert_revision, RevertReport};
pub use store::{LifecycleHooks, MemoryStore, NoHooks, RecordStore, VersionStore};
pub use tracker::RevisionManager;
