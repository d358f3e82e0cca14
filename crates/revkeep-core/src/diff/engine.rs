//! Field diff and history window diff.

use std::collections::BTreeMap;
use std::time::Instant;

use revkeep_core_types::{ObjectRef, RevisionId, TypeName};

use crate::codec;
use crate::diff::model::{ChangeKind, DiffValue, FieldChange, HistoryDiff, RevisionDiff, VersionDiff};
use crate::errors::{Result, RevkeepError};
use crate::model::{Action, Catalog, FieldKind, FieldValue, Version, WindowQuery};
use crate::registry::Registry;
use crate::store::{RecordStore, VersionStore};
use crate::{log_op_end, log_op_error, log_op_start};

/// Changed fields of `version` relative to `previous`
///
/// Every registered, non-key field is considered. Additions and deletions
/// report every field; changes report fields whose values differ where at
/// least one side is non-empty. Datetimes equal to the second are skipped.
///
/// Reference fields are resolved for display: a reference to the actor type
/// becomes the live actor record on both sides; any other reference becomes
/// the representation string of its target's version in the same revision,
/// when there is one.
///
/// # Errors
///
/// - `NotRegistered` if the version's type is not registered
/// - decoding errors for either payload
pub fn field_diff<S>(
    registry: &Registry,
    store: &S,
    version: &Version,
    previous: Option<&Version>,
) -> Result<Vec<FieldChange>>
where
    S: RecordStore + VersionStore,
{
    let catalog = registry.catalog();
    let registration = registry.registration(&version.type_name)?;
    let new_record = codec::version_record(catalog, version)?;
    let old_record = previous
        .map(|p| codec::version_record(catalog, p))
        .transpose()?;

    let mut siblings: Option<Vec<Version>> = None;
    let mut changes = Vec::new();

    for field in &registration.fields {
        let owned = catalog.find_field(&version.type_name, field)?;
        if owned.def.primary_key {
            continue;
        }

        let new_value = new_record.get(field).cloned();
        let old_value = old_record.as_ref().and_then(|r| r.get(field).cloned());
        let mut new = DiffValue::from(new_value.clone());
        let mut old = DiffValue::from(old_value.clone());

        let reported = match version.action {
            Action::Addition | Action::Deletion => true,
            Action::Change => (!new.is_empty() || !old.is_empty()) && new != old,
        };
        if !reported {
            continue;
        }
        if let (Some(a), Some(b)) = (&new_value, &old_value) {
            if a.same_second(b) {
                continue;
            }
        }

        if let (FieldKind::Reference { target }, Some(FieldValue::Ref(key))) =
            (&owned.def.kind, &new_value)
        {
            if is_actor_type(catalog, target) {
                new = resolve_actor(catalog, store, target, new_value.as_ref())?.unwrap_or(new);
                old = resolve_actor(catalog, store, target, old_value.as_ref())?.unwrap_or(old);
            } else {
                if siblings.is_none() {
                    siblings = Some(store.revision_versions(version.revision_id)?);
                }
                let versions = siblings.as_deref().unwrap_or(&[]);
                let target_storage = catalog.storage_type(target);
                if let Some(sibling) = versions
                    .iter()
                    .find(|v| v.object_key == *key && v.type_name == target_storage)
                {
                    new = DiffValue::Repr(sibling.object_repr.clone());
                }
            }
        }

        changes.push(FieldChange {
            field: field.clone(),
            new,
            old,
        });
    }
    Ok(changes)
}

fn is_actor_type(catalog: &Catalog, target: &TypeName) -> bool {
    catalog
        .actor_type()
        .is_some_and(|actor| catalog.storage_type(actor) == catalog.storage_type(target))
}

/// Live actor record behind a reference, `None` when it cannot be resolved
fn resolve_actor<S: RecordStore>(
    catalog: &Catalog,
    store: &S,
    target: &TypeName,
    value: Option<&FieldValue>,
) -> Result<Option<DiffValue>> {
    let Some(key) = value.and_then(FieldValue::as_ref_key) else {
        return Ok(None);
    };
    Ok(store.get(target, key)?.map(|record| DiffValue::Actor {
        display: catalog.display_name(&record),
        record,
    }))
}

/// Diff a version against the previous version of the same object
///
/// # Errors
///
/// Propagates store and [`field_diff`] errors.
pub fn diff_version<S>(registry: &Registry, store: &S, version: &Version) -> Result<Vec<FieldChange>>
where
    S: RecordStore + VersionStore,
{
    let previous = store
        .object_versions(&version.type_name, version.object_key)?
        .into_iter()
        .filter(|v| v.id < version.id)
        .max_by_key(|v| v.id);
    field_diff(registry, store, version, previous.as_ref())
}

/// Diff the `limit` most recent revisions
///
/// With `target`, only revisions touching that object (under its own type
/// or one of its composite ancestor types) are selected. With `up_to`,
/// later revisions are ignored. Every version of a selected revision is
/// diffed; versions without reported fields are omitted.
///
/// # Errors
///
/// - `UnknownType` if the target's type is not in the catalog
/// - store, registration and decoding errors
pub fn history_diff<S>(
    registry: &Registry,
    store: &S,
    target: Option<&ObjectRef>,
    limit: usize,
    up_to: Option<RevisionId>,
) -> Result<HistoryDiff>
where
    S: RecordStore + VersionStore,
{
    log_op_start!("history_diff", limit = limit);
    let start = Instant::now();

    let result = history_diff_impl(registry, store, target, limit, up_to);
    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(diff) => {
            log_op_end!(
                "history_diff",
                duration_ms = duration_ms,
                revision_count = diff.len()
            );
        }
        Err(err) => {
            log_op_error!("history_diff", err.clone(), duration_ms = duration_ms);
        }
    }
    result
}

fn history_diff_impl<S>(
    registry: &Registry,
    store: &S,
    target: Option<&ObjectRef>,
    limit: usize,
    up_to: Option<RevisionId>,
) -> Result<HistoryDiff>
where
    S: RecordStore + VersionStore,
{
    let scope = match target {
        Some(target) => {
            let mut types = vec![target.type_name.clone()];
            types.extend(registry.catalog().ancestors(&target.type_name)?);
            Some((types, target.key))
        }
        None => None,
    };
    let window = store.history_window(&WindowQuery {
        scope,
        limit,
        up_to,
    })?;

    let mut revisions: BTreeMap<RevisionId, RevisionDiff> = BTreeMap::new();
    for (index, version) in window.iter().enumerate() {
        if !revisions.contains_key(&version.revision_id) {
            let revision = store.revision(version.revision_id)?.ok_or(
                RevkeepError::RevisionNotFound {
                    revision_id: version.revision_id.get(),
                },
            )?;
            revisions.insert(
                version.revision_id,
                RevisionDiff {
                    revision,
                    changes: Vec::new(),
                },
            );
        }

        let mut kind = ChangeKind::from(version.action);
        let mut previous = None;
        if version.action == Action::Change {
            // Positional: the next element is the same object's older version
            // only if the window reaches back that far
            if let Some(next) = window.get(index + 1) {
                if next.object_ref() == version.object_ref() {
                    previous = Some(next);
                } else {
                    kind = ChangeKind::AddOrChange;
                }
            }
        }

        let fields = field_diff(registry, store, version, previous)?;
        if fields.is_empty() {
            continue;
        }
        if let Some(entry) = revisions.get_mut(&version.revision_id) {
            entry.changes.push(VersionDiff {
                version: version.clone(),
                kind,
                fields,
            });
        }
    }

    Ok(HistoryDiff { revisions })
}
