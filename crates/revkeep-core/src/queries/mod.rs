//! Query module for read-only history lookups
//!
//! Thin, deterministic queries over committed versions and revisions,
//! generic over the version store.
//!
//! Key principles:
//! - All queries are read-only (no mutations)
//! - Versions of one object are ordered by version id
//! - A missing answer is `None` for neighbours and `VersionNotFound` for
//!   lookups that must produce a version

pub mod version_queries;

pub use version_queries::{
    deleted_version, deleted_versions, field_dict, next_version, previous_version,
    revisions_for_object, unique_versions_for_object, version_for_date, versions_for_object,
};
