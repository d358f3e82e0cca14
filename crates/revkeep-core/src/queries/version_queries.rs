//! Version lookups for one object or one type
//!
//! Every query here reads committed history only; `deleted_versions` also
//! consults the live store to decide which objects are gone.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use revkeep_core_types::{ObjectKey, RevisionId, TypeName};

use crate::codec;
use crate::errors::{Result, RevkeepError};
use crate::model::{Catalog, FieldValue, Revision, Version};
use crate::store::{RecordStore, VersionStore};

/// Every version of an object, oldest first
///
/// # Errors
///
/// Returns `Persistence` if the backend fails.
pub fn versions_for_object<S: VersionStore>(
    store: &S,
    type_name: &TypeName,
    key: ObjectKey,
) -> Result<Vec<Version>> {
    let mut versions = store.object_versions(type_name, key)?;
    versions.sort_by_key(|v| v.id);
    Ok(versions)
}

/// Versions of an object with consecutive identical payloads collapsed
///
/// The first version of each run is kept.
///
/// # Errors
///
/// Returns `Persistence` if the backend fails.
pub fn unique_versions_for_object<S: VersionStore>(
    store: &S,
    type_name: &TypeName,
    key: ObjectKey,
) -> Result<Vec<Version>> {
    let mut unique: Vec<Version> = Vec::new();
    for version in versions_for_object(store, type_name, key)? {
        let duplicate = unique.last().is_some_and(|last| {
            last.format == version.format && last.serialized_data == version.serialized_data
        });
        if !duplicate {
            unique.push(version);
        }
    }
    Ok(unique)
}

/// Latest version of an object committed at or before `at`
///
/// # Errors
///
/// - `VersionNotFound` if no version is that old
/// - `Persistence` if the backend fails
pub fn version_for_date<S: VersionStore>(
    store: &S,
    type_name: &TypeName,
    key: ObjectKey,
    at: DateTime<Utc>,
) -> Result<Version> {
    let mut revisions: BTreeMap<RevisionId, Option<Revision>> = BTreeMap::new();
    let mut found = None;
    for version in versions_for_object(store, type_name, key)? {
        if !revisions.contains_key(&version.revision_id) {
            revisions.insert(version.revision_id, store.revision(version.revision_id)?);
        }
        let committed = revisions
            .get(&version.revision_id)
            .and_then(|r| r.as_ref())
            .is_some_and(|r| r.created_at <= at);
        if committed {
            found = Some(version);
        }
    }
    found.ok_or_else(|| RevkeepError::VersionNotFound {
        reason: format!("no version of {type_name}:{key} at or before {at}"),
    })
}

/// The version of the same object immediately before `version`
///
/// # Errors
///
/// Returns `Persistence` if the backend fails.
pub fn previous_version<S: VersionStore>(store: &S, version: &Version) -> Result<Option<Version>> {
    Ok(versions_for_object(store, &version.type_name, version.object_key)?
        .into_iter()
        .filter(|v| v.id < version.id)
        .max_by_key(|v| v.id))
}

/// The version of the same object immediately after `version`
///
/// # Errors
///
/// Returns `Persistence` if the backend fails.
pub fn next_version<S: VersionStore>(store: &S, version: &Version) -> Result<Option<Version>> {
    Ok(versions_for_object(store, &version.type_name, version.object_key)?
        .into_iter()
        .filter(|v| v.id > version.id)
        .min_by_key(|v| v.id))
}

/// Latest version of an object, typically one that has been deleted
///
/// # Errors
///
/// - `VersionNotFound` if the object was never versioned
/// - `Persistence` if the backend fails
pub fn deleted_version<S: VersionStore>(
    store: &S,
    type_name: &TypeName,
    key: ObjectKey,
) -> Result<Version> {
    versions_for_object(store, type_name, key)?
        .pop()
        .ok_or_else(|| RevkeepError::VersionNotFound {
            reason: format!("{type_name}:{key} has no versions"),
        })
}

/// Latest version of every versioned object of a type that no longer exists
///
/// Ordered by the commit time of the version's revision, then version id.
///
/// # Errors
///
/// Returns `Persistence` if the backend fails.
pub fn deleted_versions<S>(store: &S, type_name: &TypeName) -> Result<Vec<Version>>
where
    S: RecordStore + VersionStore,
{
    let mut deleted = Vec::new();
    for key in store.object_keys_for_type(type_name)? {
        if store.contains(type_name, key)? {
            continue;
        }
        if let Some(version) = versions_for_object(store, type_name, key)?.pop() {
            let created_at = store
                .revision(version.revision_id)?
                .map(|r| r.created_at)
                .ok_or(RevkeepError::RevisionNotFound {
                    revision_id: version.revision_id.get(),
                })?;
            deleted.push((created_at, version));
        }
    }
    deleted.sort_by(|(a, va), (b, vb)| a.cmp(b).then(va.id.cmp(&vb.id)));
    Ok(deleted.into_iter().map(|(_, v)| v).collect())
}

/// Revisions that contain a version of the object, newest first
///
/// # Errors
///
/// Returns `Persistence` if the backend fails.
pub fn revisions_for_object<S: VersionStore>(
    store: &S,
    type_name: &TypeName,
    key: ObjectKey,
) -> Result<Vec<Revision>> {
    let mut ids: Vec<RevisionId> = versions_for_object(store, type_name, key)?
        .iter()
        .map(|v| v.revision_id)
        .collect();
    ids.sort_unstable_by(|a, b| b.cmp(a));
    ids.dedup();

    let mut revisions = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(revision) = store.revision(id)? {
            revisions.push(revision);
        }
    }
    Ok(revisions)
}

/// Field values recorded by a version, including inherited fragments
///
/// # Errors
///
/// Returns decoding errors for the payload.
pub fn field_dict(catalog: &Catalog, version: &Version) -> Result<BTreeMap<String, FieldValue>> {
    Ok(codec::version_record(catalog, version)?.fields)
}
