//! Commit protocol
//!
//! Turns the state of a finished scope into one revision draft and hands it
//! to the version store in a single call. The store makes the write atomic.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use chrono::Utc;
use revkeep_core_types::ObjectRef;

use crate::closure::{follow_relationships, FollowOptions};
use crate::codec;
use crate::errors::{Result, RevkeepError};
use crate::model::{Action, Record, Revision, RevisionDraft, VersionDraft};
use crate::registry::Registry;
use crate::store::{RecordStore, VersionStore};
use crate::tracker::{ChangeRecord, ScopeState, Snapshot};
use crate::{log_op_end, log_op_error, log_op_start};

/// Serialize a record with its composite ancestors
///
/// The payload is restricted to the registered field whitelist and uses the
/// registered format. Ancestor fragments are read from `store`; the record
/// itself is taken as given, so unsaved in-memory edits are captured.
///
/// # Errors
///
/// - `NotRegistered` if the record's type is not registered
/// - traversal and encoding errors
pub fn snapshot<S: RecordStore>(registry: &Registry, store: &S, record: &Record) -> Result<Snapshot> {
    let registration = registry.registration(&record.type_name)?;
    let catalog = registry.catalog();

    let mut scratch = HashMap::new();
    let closure = follow_relationships(
        registry,
        store,
        [record.clone()],
        FollowOptions::ancestors(),
        &mut scratch,
    )?;
    let mut fragments: Vec<Record> = closure.into_values().map(|entry| entry.record).collect();
    fragments.sort_by_key(|fragment| catalog.depth(&fragment.type_name));

    let serialized_data = codec::encode(registration.format, &fragments, &registration.fields)?;

    // Representation sees inherited fields too
    let mut merged = Record {
        type_name: record.type_name.clone(),
        key: record.key,
        fields: BTreeMap::new(),
    };
    for fragment in &fragments {
        merged.fields.extend(fragment.fields.clone());
    }

    Ok(Snapshot {
        format: registration.format,
        serialized_data,
        object_repr: catalog.repr(&merged),
    })
}

/// Commit the state of a finished outermost scope
///
/// Nothing is written for an invalidated scope, an empty scope, or a scope
/// whose closure produced no versions.
pub(crate) fn commit_revision<S>(
    registry: &Registry,
    store: &mut S,
    state: ScopeState,
) -> Result<Option<Revision>>
where
    S: RecordStore + VersionStore,
{
    if state.invalid {
        tracing::debug!("scope invalidated, discarding changes");
        return Ok(None);
    }
    let ScopeState {
        mut objects,
        dead,
        mut changes,
        user,
        comment,
        meta,
        ..
    } = state;
    objects.retain(|object, _| !dead.contains_key(object));
    if objects.is_empty() && dead.is_empty() {
        return Ok(None);
    }

    log_op_start!(
        "commit_revision",
        live_count = objects.len(),
        dead_count = dead.len()
    );
    let start = Instant::now();

    let result = build_versions(registry, &*store, &objects, &dead, &mut changes).and_then(
        |versions| {
            if versions.is_empty() {
                return Ok(None);
            }
            let draft = RevisionDraft {
                created_at: Utc::now(),
                user,
                comment,
                versions,
                meta,
            };
            store.commit_revision(draft).map(Some)
        },
    );

    let duration_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(Some(revision)) => {
            log_op_end!(
                "commit_revision",
                duration_ms = duration_ms,
                revision_id = revision.id.get()
            );
            Ok(Some(revision))
        }
        Ok(None) => {
            log_op_end!("commit_revision", duration_ms = duration_ms);
            Ok(None)
        }
        Err(err) => {
            log_op_error!("commit_revision", err.clone(), duration_ms = duration_ms);
            Err(err)
        }
    }
}

fn build_versions<S: RecordStore>(
    registry: &Registry,
    store: &S,
    live: &BTreeMap<ObjectRef, Record>,
    dead: &BTreeMap<ObjectRef, Record>,
    changes: &mut HashMap<ObjectRef, ChangeRecord>,
) -> Result<Vec<VersionDraft>> {
    let catalog = registry.catalog();
    let closure = follow_relationships(
        registry,
        store,
        live.values().cloned(),
        FollowOptions::default(),
        changes,
    )?;

    let mut versions = Vec::new();
    for (object, entry) in closure {
        if catalog.is_shadow(&object.type_name) {
            continue;
        }
        if entry.action == Action::Deletion {
            return Err(RevkeepError::DeletionInvariantViolation {
                object: object.to_string(),
                reason: "deleted object reached among live objects".to_string(),
            });
        }
        // Tracked copies may hold edits the store has not seen
        let record = live.get(&object).unwrap_or(&entry.record);
        let snapshot = snapshot(registry, store, record)?;
        versions.push(VersionDraft {
            object_key: object.key,
            type_name: object.type_name,
            format: snapshot.format.tag().to_string(),
            serialized_data: snapshot.serialized_data,
            object_repr: snapshot.object_repr,
            action: entry.action,
        });
    }

    for object in dead.keys() {
        let change = changes.get(object);
        let frozen = match change {
            Some(change) if change.action == Action::Deletion => change.frozen.as_ref(),
            _ => None,
        };
        let frozen = frozen.ok_or_else(|| RevkeepError::DeletionInvariantViolation {
            object: object.to_string(),
            reason: "deleted object has no frozen payload".to_string(),
        })?;
        versions.push(VersionDraft {
            object_key: object.key,
            type_name: object.type_name.clone(),
            format: frozen.format.tag().to_string(),
            serialized_data: frozen.serialized_data.clone(),
            object_repr: frozen.object_repr.clone(),
            action: Action::Deletion,
        });
    }

    tracing::debug!(version_count = versions.len(), "revision draft built");
    Ok(versions)
}
