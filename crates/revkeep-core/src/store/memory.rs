use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use revkeep_core_types::{ObjectKey, RevisionId, TypeName, VersionId};

use super::{RecordStore, VersionStore};
use crate::errors::{Result, RevkeepError};
use crate::model::{
    Catalog, FieldValue, MetaRecord, Record, Revision, RevisionDraft, Version, WindowQuery,
};

/// In-memory store for live records and revision history
///
/// Not thread-safe (no Arc/RwLock); each context owns its store or wraps it
/// itself. Used by the test suites and for embedding.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    catalog: Arc<Catalog>,
    /// Live records keyed by (storage type, key)
    records: BTreeMap<(TypeName, ObjectKey), BTreeMap<String, FieldValue>>,
    next_key: i64,
    revisions: BTreeMap<RevisionId, Revision>,
    versions: BTreeMap<VersionId, Version>,
    meta: BTreeMap<RevisionId, Vec<MetaRecord>>,
    next_revision: i64,
    next_version: i64,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            records: BTreeMap::new(),
            next_key: 1,
            revisions: BTreeMap::new(),
            versions: BTreeMap::new(),
            meta: BTreeMap::new(),
            next_revision: 1,
            next_version: 1,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Number of committed revisions
    pub fn revision_count(&self) -> usize {
        self.revisions.len()
    }

    /// Number of committed versions
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    fn slot(&self, type_name: &TypeName, key: ObjectKey) -> (TypeName, ObjectKey) {
        (self.catalog.storage_type(type_name), key)
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, type_name: &TypeName, key: ObjectKey) -> Result<Option<Record>> {
        Ok(self
            .records
            .get(&self.slot(type_name, key))
            .map(|fields| Record {
                type_name: type_name.clone(),
                key: Some(key),
                fields: fields.clone(),
            }))
    }

    fn save(&mut self, record: &mut Record) -> Result<()> {
        let key = match record.key {
            Some(key) => {
                self.next_key = self.next_key.max(key.get() + 1);
                key
            }
            None => {
                let key = ObjectKey::new(self.next_key);
                self.next_key += 1;
                record.key = Some(key);
                key
            }
        };
        let slot = self.slot(&record.type_name, key);
        self.records.insert(slot, record.fields.clone());
        Ok(())
    }

    fn remove(&mut self, type_name: &TypeName, key: ObjectKey) -> Result<bool> {
        let slot = self.slot(type_name, key);
        Ok(self.records.remove(&slot).is_some())
    }

    fn referencing(&self, source: &TypeName, field: &str, key: ObjectKey) -> Result<Vec<Record>> {
        let storage = self.catalog.storage_type(source);
        Ok(self
            .records
            .iter()
            .filter(|((type_name, _), _)| *type_name == storage)
            .filter(|(_, fields)| match fields.get(field) {
                Some(FieldValue::Ref(target)) => *target == key,
                Some(FieldValue::RefSet(targets)) => targets.contains(&key),
                _ => false,
            })
            .map(|((_, k), fields)| Record {
                type_name: source.clone(),
                key: Some(*k),
                fields: fields.clone(),
            })
            .collect())
    }
}

impl VersionStore for MemoryStore {
    fn commit_revision(&mut self, draft: RevisionDraft) -> Result<Revision> {
        if draft.versions.is_empty() {
            return Err(RevkeepError::EmptyRevision);
        }

        // Build everything first so a failure leaves the store untouched
        let revision = Revision {
            id: RevisionId::new(self.next_revision),
            created_at: draft.created_at,
            user: draft.user,
            comment: draft.comment,
        };
        let versions: Vec<Version> = draft
            .versions
            .into_iter()
            .enumerate()
            .map(|(offset, v)| Version {
                id: VersionId::new(self.next_version + offset as i64),
                revision_id: revision.id,
                object_key: v.object_key,
                type_name: v.type_name,
                format: v.format,
                serialized_data: v.serialized_data,
                object_repr: v.object_repr,
                action: v.action,
            })
            .collect();

        self.next_revision += 1;
        self.next_version += versions.len() as i64;
        for version in versions {
            self.versions.insert(version.id, version);
        }
        self.meta.insert(revision.id, draft.meta);
        self.revisions.insert(revision.id, revision.clone());
        Ok(revision)
    }

    fn revision(&self, id: RevisionId) -> Result<Option<Revision>> {
        Ok(self.revisions.get(&id).cloned())
    }

    fn revision_versions(&self, id: RevisionId) -> Result<Vec<Version>> {
        Ok(self
            .versions
            .values()
            .filter(|v| v.revision_id == id)
            .cloned()
            .collect())
    }

    fn revision_meta(&self, id: RevisionId) -> Result<Vec<MetaRecord>> {
        Ok(self.meta.get(&id).cloned().unwrap_or_default())
    }

    fn version(&self, id: VersionId) -> Result<Option<Version>> {
        Ok(self.versions.get(&id).cloned())
    }

    fn object_versions(&self, type_name: &TypeName, key: ObjectKey) -> Result<Vec<Version>> {
        Ok(self
            .versions
            .values()
            .filter(|v| v.type_name == *type_name && v.object_key == key)
            .cloned()
            .collect())
    }

    fn history_window(&self, query: &WindowQuery) -> Result<Vec<Version>> {
        let in_scope = |v: &Version| match &query.scope {
            Some((types, key)) => v.object_key == *key && types.contains(&v.type_name),
            None => true,
        };
        let below_bound = |v: &Version| query.up_to.map_or(true, |up_to| v.revision_id <= up_to);

        let revision_ids: BTreeSet<RevisionId> = self
            .versions
            .values()
            .filter(|v| in_scope(v) && below_bound(v))
            .map(|v| v.revision_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .rev()
            .take(query.limit)
            .collect();

        let mut window: Vec<Version> = self
            .versions
            .values()
            .filter(|v| revision_ids.contains(&v.revision_id))
            .cloned()
            .collect();
        window.sort_by(|a, b| {
            a.object_key
                .cmp(&b.object_key)
                .then_with(|| a.type_name.cmp(&b.type_name))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(window)
    }

    fn object_keys_for_type(&self, type_name: &TypeName) -> Result<Vec<ObjectKey>> {
        let keys: BTreeSet<ObjectKey> = self
            .versions
            .values()
            .filter(|v| v.type_name == *type_name)
            .map(|v| v.object_key)
            .collect();
        Ok(keys.into_iter().collect())
    }

    fn delete_revision(&mut self, id: RevisionId) -> Result<bool> {
        if self.revisions.remove(&id).is_none() {
            return Ok(false);
        }
        self.versions.retain(|_, v| v.revision_id != id);
        self.meta.remove(&id);
        Ok(true)
    }
}
