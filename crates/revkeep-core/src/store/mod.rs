//! Persistence seams
//!
//! The engine only talks to storage through these traits. [`RecordStore`]
//! holds the live objects, [`VersionStore`] the committed history. Both are
//! implemented by [`MemoryStore`] here and by the SQLite backend in
//! `revkeep-store`.

pub mod memory;

pub use memory::MemoryStore;

use revkeep_core_types::{ObjectKey, RevisionId, TypeName, VersionId};

use crate::errors::{Result, RevkeepError};
use crate::model::{MetaRecord, Record, Revision, RevisionDraft, Version, WindowQuery};

/// Callbacks fired around writes made through [`RecordStore::save_with`] and
/// [`RecordStore::delete_with`]
pub trait LifecycleHooks {
    /// Called after the record has been written
    ///
    /// # Errors
    ///
    /// An error is returned to the caller of `save_with`; the write has
    /// already happened.
    fn post_save<S: RecordStore>(&mut self, store: &S, record: &Record, created: bool)
        -> Result<()>;

    /// Called while the record still exists, before it is removed
    ///
    /// # Errors
    ///
    /// An error aborts the delete.
    fn pre_delete<S: RecordStore>(&mut self, store: &S, record: &Record) -> Result<()>;
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl LifecycleHooks for NoHooks {
    fn post_save<S: RecordStore>(&mut self, _: &S, _: &Record, _: bool) -> Result<()> {
        Ok(())
    }

    fn pre_delete<S: RecordStore>(&mut self, _: &S, _: &Record) -> Result<()> {
        Ok(())
    }
}

/// Live object storage
///
/// Shadow types are stored under their base type; reads return the record
/// under the type name that was asked for.
pub trait RecordStore {
    /// # Errors
    ///
    /// Returns `Persistence` if the backend fails.
    fn get(&self, type_name: &TypeName, key: ObjectKey) -> Result<Option<Record>>;

    /// Insert or overwrite a record, assigning a fresh key when it has none
    ///
    /// Keys are never reused, including keys of deleted records.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backend fails.
    fn save(&mut self, record: &mut Record) -> Result<()>;

    /// Remove a record; returns whether it existed
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backend fails.
    fn remove(&mut self, type_name: &TypeName, key: ObjectKey) -> Result<bool>;

    /// Records of `source` whose reference field `field` points at `key`
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backend fails.
    fn referencing(&self, source: &TypeName, field: &str, key: ObjectKey) -> Result<Vec<Record>>;

    /// # Errors
    ///
    /// Returns `Persistence` if the backend fails.
    fn contains(&self, type_name: &TypeName, key: ObjectKey) -> Result<bool> {
        Ok(self.get(type_name, key)?.is_some())
    }

    /// Save and notify `hooks`
    ///
    /// # Errors
    ///
    /// Propagates store and hook errors.
    fn save_with<H: LifecycleHooks>(&mut self, record: &mut Record, hooks: &mut H) -> Result<()>
    where
        Self: Sized,
    {
        let created = match record.key {
            None => true,
            Some(key) => !self.contains(&record.type_name, key)?,
        };
        self.save(record)?;
        hooks.post_save(&*self, record, created)
    }

    /// Notify `hooks`, then delete
    ///
    /// # Errors
    ///
    /// Returns `MissingKey` for an unsaved record; propagates store and hook
    /// errors.
    fn delete_with<H: LifecycleHooks>(&mut self, record: &Record, hooks: &mut H) -> Result<bool>
    where
        Self: Sized,
    {
        let key = record.key.ok_or_else(|| RevkeepError::MissingKey {
            type_name: record.type_name.to_string(),
        })?;
        hooks.pre_delete(&*self, record)?;
        self.remove(&record.type_name, key)
    }
}

/// Committed revision history
pub trait VersionStore {
    /// Persist a revision with all its versions and metadata atomically
    ///
    /// # Errors
    ///
    /// Returns `EmptyRevision` for a draft without versions; `Persistence`
    /// if the backend fails, in which case nothing is written.
    fn commit_revision(&mut self, draft: RevisionDraft) -> Result<Revision>;

    /// # Errors
    ///
    /// Returns `Persistence` if the backend fails.
    fn revision(&self, id: RevisionId) -> Result<Option<Revision>>;

    /// Versions of a revision, oldest first
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backend fails.
    fn revision_versions(&self, id: RevisionId) -> Result<Vec<Version>>;

    /// # Errors
    ///
    /// Returns `Persistence` if the backend fails.
    fn revision_meta(&self, id: RevisionId) -> Result<Vec<MetaRecord>>;

    /// # Errors
    ///
    /// Returns `Persistence` if the backend fails.
    fn version(&self, id: VersionId) -> Result<Option<Version>>;

    /// Every version of one object, oldest first
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backend fails.
    fn object_versions(&self, type_name: &TypeName, key: ObjectKey) -> Result<Vec<Version>>;

    /// All versions of the revisions selected by `query`
    ///
    /// Ordered by object key, then type name, then version id descending,
    /// so each object's versions are adjacent, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backend fails.
    fn history_window(&self, query: &WindowQuery) -> Result<Vec<Version>>;

    /// Distinct keys that have versions of `type_name`
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backend fails.
    fn object_keys_for_type(&self, type_name: &TypeName) -> Result<Vec<ObjectKey>>;

    /// Delete a revision with its versions and metadata
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backend fails.
    fn delete_revision(&mut self, id: RevisionId) -> Result<bool>;
}
