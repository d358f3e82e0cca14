//! Change tracking for revision scopes
//!
//! A [`RevisionManager`] belongs to one execution context. Scopes nest;
//! only the outermost `end` commits. Records reach the manager either
//! explicitly through [`RevisionManager::add`] or through the
//! [`LifecycleHooks`] it implements, when writes go through
//! [`RecordStore::save_with`] / [`RecordStore::delete_with`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use revkeep_core_types::{ObjectKey, ObjectRef};

use crate::closure::{follow_relationships, FollowOptions};
use crate::codec::Format;
use crate::commit;
use crate::errors::{Result, RevkeepError};
use crate::model::{Action, MetaRecord, Record, Revision};
use crate::registry::Registry;
use crate::store::{LifecycleHooks, RecordStore, VersionStore};

/// Serialized snapshot of an object and its ancestors
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub format: Format,
    pub serialized_data: String,
    pub object_repr: String,
}

/// Pending action of one object within a scope
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub action: Action,
    /// Captured before deletion, while the record still exists
    pub frozen: Option<Snapshot>,
}

impl ChangeRecord {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            frozen: None,
        }
    }
}

/// Mutable state of the current (outermost) scope
#[derive(Debug, Default)]
pub(crate) struct ScopeState {
    pub(crate) objects: BTreeMap<ObjectRef, Record>,
    pub(crate) dead: BTreeMap<ObjectRef, Record>,
    pub(crate) changes: HashMap<ObjectRef, ChangeRecord>,
    pub(crate) depth: usize,
    pub(crate) invalid: bool,
    pub(crate) user: Option<ObjectKey>,
    pub(crate) comment: String,
    pub(crate) meta: Vec<MetaRecord>,
}

/// Per-context revision tracker
#[derive(Debug)]
pub struct RevisionManager {
    registry: Arc<Registry>,
    state: ScopeState,
}

impl RevisionManager {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            state: ScopeState::default(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Begin a (possibly nested) scope
    pub fn start(&mut self) {
        self.state.depth += 1;
    }

    pub fn is_active(&self) -> bool {
        self.state.depth > 0
    }

    pub fn depth(&self) -> usize {
        self.state.depth
    }

    /// # Errors
    ///
    /// Returns `NotInScope` when no scope is active.
    pub fn assert_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(RevkeepError::NotInScope)
        }
    }

    /// Track a changed object
    ///
    /// A deletion freezes the record (unless already frozen), moves it to
    /// the dead set and pulls its immediate neighbours into the live set.
    /// Call it for deletions while the record still exists in `store`.
    ///
    /// # Errors
    ///
    /// - `NotInScope` when no scope is active
    /// - `MissingKey` for an unsaved record
    /// - registration, traversal and encoding errors while freezing
    pub fn add<S: RecordStore>(&mut self, store: &S, record: &Record, action: Action) -> Result<()> {
        self.assert_active()?;
        let object = record.object_ref().ok_or_else(|| RevkeepError::MissingKey {
            type_name: record.type_name.to_string(),
        })?;

        if action != Action::Deletion {
            let change = self
                .state
                .changes
                .entry(object.clone())
                .or_insert_with(|| ChangeRecord::new(action));
            if !matches!(change.action, Action::Addition | Action::Deletion) {
                change.action = action;
            }
            self.state.objects.insert(object, record.clone());
            return Ok(());
        }

        // A deletion through a shadow type deletes the base object
        let catalog = self.registry.catalog();
        let storage = catalog.storage_type(&record.type_name);
        let base;
        let (record, object) = if storage != record.type_name
            && self.registry.is_registered(&storage)
        {
            base = Record {
                type_name: storage.clone(),
                key: record.key,
                fields: record.fields.clone(),
            };
            self.state
                .objects
                .retain(|o, _| o.key != object.key || catalog.storage_type(&o.type_name) != storage);
            (&base, ObjectRef::new(storage, object.key))
        } else {
            (record, object)
        };

        let already_frozen = self
            .state
            .changes
            .get(&object)
            .is_some_and(|c| c.frozen.is_some());
        if !already_frozen {
            let frozen = commit::snapshot(&self.registry, store, record)?;
            self.state
                .changes
                .entry(object.clone())
                .or_insert_with(|| ChangeRecord::new(Action::Deletion))
                .frozen = Some(frozen);
        }
        if let Some(change) = self.state.changes.get_mut(&object) {
            change.action = Action::Deletion;
        }

        let neighbours = follow_relationships(
            &self.registry,
            store,
            [record.clone()],
            FollowOptions::neighbours(),
            &mut self.state.changes,
        )?;
        self.state.dead.insert(object.clone(), record.clone());
        for (neighbour, entry) in neighbours {
            if !self.state.dead.contains_key(&neighbour) {
                self.state.objects.entry(neighbour).or_insert(entry.record);
            }
        }
        self.state.objects.remove(&object);
        Ok(())
    }

    /// Pending change of an object in the current scope
    pub fn change_record(&self, object: &ObjectRef) -> Option<&ChangeRecord> {
        self.state.changes.get(object)
    }

    /// Objects currently tracked as live
    pub fn tracked(&self) -> impl Iterator<Item = &ObjectRef> {
        self.state.objects.keys()
    }

    pub fn is_dead(&self, object: &ObjectRef) -> bool {
        self.state.dead.contains_key(object)
    }

    /// Set the actor recorded on the revision
    ///
    /// # Errors
    ///
    /// Returns `NotInScope` when no scope is active.
    pub fn set_user(&mut self, user: Option<ObjectKey>) -> Result<()> {
        self.assert_active()?;
        self.state.user = user;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `NotInScope` when no scope is active.
    pub fn user(&self) -> Result<Option<ObjectKey>> {
        self.assert_active()?;
        Ok(self.state.user)
    }

    /// # Errors
    ///
    /// Returns `NotInScope` when no scope is active.
    pub fn set_comment(&mut self, comment: impl Into<String>) -> Result<()> {
        self.assert_active()?;
        self.state.comment = comment.into();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `NotInScope` when no scope is active.
    pub fn comment(&self) -> Result<&str> {
        self.assert_active()?;
        Ok(&self.state.comment)
    }

    /// Attach an extra metadata record to the revision
    ///
    /// # Errors
    ///
    /// Returns `NotInScope` when no scope is active.
    pub fn add_meta(&mut self, meta: MetaRecord) -> Result<()> {
        self.assert_active()?;
        self.state.meta.push(meta);
        Ok(())
    }

    /// Mark the scope as broken so nothing is committed
    ///
    /// # Errors
    ///
    /// Returns `NotInScope` when no scope is active.
    pub fn invalidate(&mut self) -> Result<()> {
        self.assert_active()?;
        self.state.invalid = true;
        Ok(())
    }

    pub fn is_invalid(&self) -> bool {
        self.state.invalid
    }

    /// Close a scope; the outermost close commits
    ///
    /// Scope state is cleared after the outermost close even when the commit
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns `NotInScope` when no scope is active, or the commit error.
    pub fn end<S>(&mut self, store: &mut S) -> Result<Option<Revision>>
    where
        S: RecordStore + VersionStore,
    {
        self.assert_active()?;
        self.state.depth -= 1;
        if self.state.depth > 0 {
            return Ok(None);
        }
        let state = std::mem::take(&mut self.state);
        commit::commit_revision(&self.registry, store, state)
    }

    /// Run `f` inside a scope
    ///
    /// An error from `f` invalidates the scope; the scope is always closed.
    /// The error from `f` takes precedence over an error from closing.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or else the error of `end`.
    pub fn run<S, T, F>(&mut self, store: &mut S, f: F) -> Result<T>
    where
        S: RecordStore + VersionStore,
        F: FnOnce(&mut Self, &mut S) -> Result<T>,
    {
        self.start();
        let result = f(self, store);
        if result.is_err() {
            self.state.invalid = true;
        }
        let ended = self.end(store);
        let value = result?;
        ended?;
        Ok(value)
    }
}

impl LifecycleHooks for RevisionManager {
    fn post_save<S: RecordStore>(&mut self, store: &S, record: &Record, created: bool) -> Result<()> {
        if !self.is_active() || !self.registry.is_registered(&record.type_name) {
            return Ok(());
        }
        let action = if created {
            Action::Addition
        } else {
            Action::Change
        };
        self.add(store, record, action)
    }

    fn pre_delete<S: RecordStore>(&mut self, store: &S, record: &Record) -> Result<()> {
        if !self.is_active() || !self.registry.is_registered(&record.type_name) {
            return Ok(());
        }
        self.add(store, record, Action::Deletion)
    }
}
