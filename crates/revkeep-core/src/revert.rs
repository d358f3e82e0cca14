//! Reverting a revision back into the live store

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use revkeep_core_types::{ObjectKey, ObjectRef, RevisionId, TypeName};

use crate::closure::{follow_relationships, FollowOptions};
use crate::codec;
use crate::errors::{Result, RevkeepError};
use crate::registry::Registry;
use crate::store::{LifecycleHooks, RecordStore, VersionStore};
use crate::{log_op_end, log_op_error, log_op_start};

/// What a revert touched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevertReport {
    /// Objects written back, one per version of the revision
    pub restored: Vec<ObjectRef>,
    /// Objects deleted because they were not part of the revision
    pub deleted: Vec<ObjectRef>,
}

/// Restore every object of a revision to its recorded state
///
/// Each version's fragments are written back least-derived first, merged
/// over the live record when it still exists. With `delete`, objects that
/// are now related to the restored set but were not part of the revision
/// are deleted. All writes go through `hooks`, so a revert performed inside
/// an active scope is itself versioned.
///
/// # Errors
///
/// - `RevisionNotFound` if the revision does not exist
/// - decoding, traversal and store errors
pub fn revert_revision<S, H>(
    registry: &Registry,
    store: &mut S,
    hooks: &mut H,
    revision: RevisionId,
    delete: bool,
) -> Result<RevertReport>
where
    S: RecordStore + VersionStore,
    H: LifecycleHooks,
{
    log_op_start!("revert_revision", revision_id = revision.get(), delete = delete);
    let start = Instant::now();

    let result = revert_impl(registry, store, hooks, revision, delete);
    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(report) => {
            log_op_end!(
                "revert_revision",
                duration_ms = duration_ms,
                restored_count = report.restored.len(),
                deleted_count = report.deleted.len()
            );
        }
        Err(err) => {
            log_op_error!("revert_revision", err.clone(), duration_ms = duration_ms);
        }
    }
    result
}

fn revert_impl<S, H>(
    registry: &Registry,
    store: &mut S,
    hooks: &mut H,
    revision: RevisionId,
    delete: bool,
) -> Result<RevertReport>
where
    S: RecordStore + VersionStore,
    H: LifecycleHooks,
{
    let catalog = registry.catalog();
    if store.revision(revision)?.is_none() {
        return Err(RevkeepError::RevisionNotFound {
            revision_id: revision.get(),
        });
    }
    let versions = store.revision_versions(revision)?;

    let mut report = RevertReport::default();
    for version in &versions {
        let mut fragments = codec::decode_version(version)?;
        fragments.sort_by_key(|fragment| catalog.depth(&fragment.type_name));
        for fragment in fragments {
            let mut record = match store.get(&fragment.type_name, fragment.key)? {
                Some(mut live) => {
                    live.fields.extend(fragment.fields);
                    live
                }
                None => fragment.into_record(),
            };
            store.save_with(&mut record, hooks)?;
        }
        report.restored.push(version.object_ref());
    }

    if !delete {
        return Ok(report);
    }

    let mut restored_records = Vec::new();
    for object in &report.restored {
        if let Some(record) = store.get(&object.type_name, object.key)? {
            restored_records.push(record);
        }
    }
    let restored_slots: HashSet<(TypeName, ObjectKey)> = report
        .restored
        .iter()
        .map(|o| (catalog.storage_type(&o.type_name), o.key))
        .collect();

    let mut scratch = HashMap::new();
    let current = follow_relationships(
        registry,
        &*store,
        restored_records,
        FollowOptions::default(),
        &mut scratch,
    )?;
    for (object, entry) in current {
        if restored_slots.contains(&(catalog.storage_type(&object.type_name), object.key)) {
            continue;
        }
        if store.contains(&object.type_name, object.key)? {
            store.delete_with(&entry.record, hooks)?;
            report.deleted.push(object);
        }
    }
    Ok(report)
}
