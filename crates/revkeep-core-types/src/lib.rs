//! Core types shared across revkeep crates
//!
//! This crate provides foundational types used by the versioning engine,
//! the persistence backends and the logging facility:
//!
//! - **Identity types**: TypeName, ObjectKey, ObjectRef, RevisionId, VersionId
//! - **Schema constants**: Canonical field keys and event names

pub mod identity;
pub mod schema;

pub use identity::{ObjectKey, ObjectRef, RevisionId, TypeName, VersionId};
