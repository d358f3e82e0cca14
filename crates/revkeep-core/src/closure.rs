//! Graph closure over registered relationships
//!
//! Expands a set of records over their followed relations (or over their
//! composite parents) until no new object is reached or the depth limit is
//! hit. The visited set is keyed by [`ObjectRef`], so cycles terminate no
//! matter how records are represented in memory.

use std::collections::{BTreeMap, HashMap, HashSet};

use revkeep_core_types::{ObjectKey, ObjectRef, TypeName};

use crate::errors::{Result, RevkeepError};
use crate::model::{Action, FieldValue, Record};
use crate::registry::{RelationKind, Registry};
use crate::store::RecordStore;
use crate::tracker::ChangeRecord;

/// Traversal settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowOptions {
    /// Records at this level are included but not expanded
    pub max_depth: Option<usize>,
    /// Include the seeds themselves
    pub inclusive: bool,
    /// Follow composite parent links instead of registered relations
    pub ancestors_only: bool,
}

impl Default for FollowOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            inclusive: true,
            ancestors_only: false,
        }
    }
}

impl FollowOptions {
    /// Inclusive, unbounded ancestor closure
    pub fn ancestors() -> Self {
        Self {
            ancestors_only: true,
            ..Self::default()
        }
    }

    /// Immediate relationship neighbours, seeds excluded
    pub fn neighbours() -> Self {
        Self {
            max_depth: Some(1),
            inclusive: false,
            ancestors_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosureEntry {
    pub record: Record,
    pub action: Action,
}

pub type ClosureSet = BTreeMap<ObjectRef, ClosureEntry>;

/// Compute the closure of `seeds`
///
/// In relationship mode every reached neighbour is marked as changed in
/// `changes` unless it is already marked as added or deleted.
///
/// # Errors
///
/// - `NotRegistered` when relationship mode reaches an unregistered,
///   non-shadow record
/// - `InvalidRelationship` when a followed field holds a non-reference value
/// - store errors while resolving references
pub fn follow_relationships<S, I>(
    registry: &Registry,
    store: &S,
    seeds: I,
    options: FollowOptions,
    changes: &mut HashMap<ObjectRef, ChangeRecord>,
) -> Result<ClosureSet>
where
    S: RecordStore,
    I: IntoIterator<Item = Record>,
{
    let mut visited: HashSet<ObjectRef> = HashSet::new();
    let mut reached: BTreeMap<ObjectRef, Record> = BTreeMap::new();
    let mut stack: Vec<(Record, usize)> = seeds.into_iter().map(|r| (r, 0)).collect();
    stack.reverse();

    while let Some((record, level)) = stack.pop() {
        let Some(object) = record.object_ref() else {
            continue;
        };
        if !visited.insert(object.clone()) {
            continue;
        }
        if options.inclusive || level > 0 {
            reached.insert(object.clone(), record.clone());
        }
        if options.max_depth.is_some_and(|max| level >= max) {
            continue;
        }

        let neighbours = if options.ancestors_only {
            parent_fragments(registry, store, &record)?
        } else {
            let mut found = related_records(registry, store, &record)?;
            for neighbour in &found {
                if let Some(neighbour_ref) = neighbour.object_ref() {
                    mark_changed(changes, neighbour_ref);
                }
            }
            found.extend(shadow_base(registry, store, &record)?);
            found
        };
        // Reverse so the first neighbour is expanded first
        stack.extend(neighbours.into_iter().rev().map(|n| (n, level + 1)));
    }

    tracing::debug!(
        closure_len = reached.len(),
        ancestors_only = options.ancestors_only,
        "closure computed"
    );

    Ok(reached
        .into_iter()
        .map(|(object, record)| {
            let action = changes
                .get(&object)
                .map(|c| c.action)
                .unwrap_or(Action::Change);
            (object, ClosureEntry { record, action })
        })
        .collect())
}

fn mark_changed(changes: &mut HashMap<ObjectRef, ChangeRecord>, object: ObjectRef) {
    // Additions and deletions keep their mark
    changes
        .entry(object)
        .or_insert_with(|| ChangeRecord::new(Action::Change));
}

fn parent_fragments<S: RecordStore>(
    registry: &Registry,
    store: &S,
    record: &Record,
) -> Result<Vec<Record>> {
    let Some(key) = record.key else {
        return Ok(Vec::new());
    };
    let catalog = registry.catalog();
    let mut out = Vec::new();
    for link in &catalog.get(&catalog.storage_type(&record.type_name))?.parents {
        if let Some(parent) = store.get(&link.parent, key)? {
            out.push(parent);
        }
    }
    Ok(out)
}

fn shadow_base<S: RecordStore>(
    registry: &Registry,
    store: &S,
    record: &Record,
) -> Result<Option<Record>> {
    let catalog = registry.catalog();
    let (true, Some(key)) = (catalog.is_shadow(&record.type_name), record.key) else {
        return Ok(None);
    };
    let base = catalog.storage_type(&record.type_name);
    if !registry.is_registered(&base) {
        return Ok(None);
    }
    store.get(&base, key)
}

fn related_records<S: RecordStore>(
    registry: &Registry,
    store: &S,
    record: &Record,
) -> Result<Vec<Record>> {
    let Some(key) = record.key else {
        return Ok(Vec::new());
    };
    let registration = match registry.registration(&record.type_name) {
        Ok(registration) => registration,
        // A shadow of a registered base only contributes its base record
        Err(_) if registry.catalog().is_shadow(&record.type_name) => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut out = Vec::new();
    for relation in &registration.follow {
        match &relation.kind {
            RelationKind::Forward { field, target } | RelationKind::Many { field, target } => {
                let value = field_value(registry, store, record, &relation.owner, field)?;
                for target_key in reference_keys(&relation.name, value.as_ref())? {
                    if let Some(target) = store.get(target, target_key)? {
                        out.push(target);
                    }
                }
            }
            RelationKind::Reverse { source, field } => {
                out.extend(store.referencing(source, field, key)?);
            }
        }
    }
    Ok(out)
}

/// Read a field from the record, or from the ancestor fragment declaring it
fn field_value<S: RecordStore>(
    registry: &Registry,
    store: &S,
    record: &Record,
    owner: &TypeName,
    field: &str,
) -> Result<Option<FieldValue>> {
    let catalog = registry.catalog();
    if catalog.storage_type(owner) == catalog.storage_type(&record.type_name) {
        return Ok(record.get(field).cloned());
    }
    match record.key {
        Some(key) => Ok(store
            .get(owner, key)?
            .and_then(|fragment| fragment.fields.get(field).cloned())),
        None => Ok(None),
    }
}

fn reference_keys(relationship: &str, value: Option<&FieldValue>) -> Result<Vec<ObjectKey>> {
    match value {
        None | Some(FieldValue::Null) => Ok(Vec::new()),
        Some(FieldValue::Ref(key)) => Ok(vec![*key]),
        Some(FieldValue::RefSet(keys)) => Ok(keys.iter().copied().collect()),
        Some(other) => Err(RevkeepError::InvalidRelationship {
            relationship: relationship.to_string(),
            found: other.type_label().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::model::{Catalog, FieldKind, TypeSchema};
    use crate::registry::RegisterOptions;
    use crate::store::MemoryStore;

    fn setup() -> (Registry, MemoryStore) {
        let catalog = Arc::new(
            Catalog::new()
                .with(TypeSchema::new("Author").field("name", FieldKind::Text))
                .with(
                    TypeSchema::new("Book")
                        .field("title", FieldKind::Text)
                        .reference("author", "Author"),
                ),
        );
        let mut registry = Registry::new(catalog.clone());
        registry
            .register("Author", RegisterOptions::new().follow(["book_set"]))
            .unwrap();
        registry
            .register("Book", RegisterOptions::new().follow(["author"]))
            .unwrap();
        (registry, MemoryStore::new(catalog))
    }

    fn save(store: &mut MemoryStore, mut record: Record) -> Record {
        store.save(&mut record).unwrap();
        record
    }

    #[test]
    fn test_cycle_terminates_and_reaches_everything() {
        let (registry, mut store) = setup();
        let author = save(&mut store, Record::new("Author").with_field("name", "a"));
        let author_key = author.key.unwrap();
        let b1 = save(
            &mut store,
            Record::new("Book").with_field("title", "one").with_field("author", author_key),
        );
        save(
            &mut store,
            Record::new("Book").with_field("title", "two").with_field("author", author_key),
        );

        let mut changes = HashMap::new();
        let closure =
            follow_relationships(&registry, &store, [b1], FollowOptions::default(), &mut changes)
                .unwrap();
        assert_eq!(closure.len(), 3);
        assert!(closure.contains_key(&ObjectRef::new("Author", author_key)));
    }

    #[test]
    fn test_closure_is_idempotent() {
        let (registry, mut store) = setup();
        let author = save(&mut store, Record::new("Author").with_field("name", "a"));
        let book = save(
            &mut store,
            Record::new("Book").with_field("author", author.key.unwrap()),
        );

        let mut changes = HashMap::new();
        let first =
            follow_relationships(&registry, &store, [book], FollowOptions::default(), &mut changes)
                .unwrap();
        let seeds: Vec<Record> = first.values().map(|e| e.record.clone()).collect();
        let second =
            follow_relationships(&registry, &store, seeds, FollowOptions::default(), &mut changes)
                .unwrap();
        assert_eq!(
            first.keys().collect::<Vec<_>>(),
            second.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_neighbours_exclude_seed_and_stop_at_depth_one() {
        let (registry, mut store) = setup();
        let author = save(&mut store, Record::new("Author").with_field("name", "a"));
        let key = author.key.unwrap();
        save(&mut store, Record::new("Book").with_field("author", key));
        save(&mut store, Record::new("Book").with_field("author", key));

        let mut changes = HashMap::new();
        let closure = follow_relationships(
            &registry,
            &store,
            [author],
            FollowOptions::neighbours(),
            &mut changes,
        )
        .unwrap();
        assert_eq!(closure.len(), 2);
        assert!(closure.keys().all(|o| o.type_name.as_str() == "Book"));
        assert!(closure.values().all(|e| e.action == Action::Change));
    }

    #[test]
    fn test_addition_mark_is_not_downgraded() {
        let (registry, mut store) = setup();
        let author = save(&mut store, Record::new("Author").with_field("name", "a"));
        let author_ref = ObjectRef::new("Author", author.key.unwrap());
        let book = save(
            &mut store,
            Record::new("Book").with_field("author", author.key.unwrap()),
        );

        let mut changes = HashMap::new();
        changes.insert(author_ref.clone(), ChangeRecord::new(Action::Addition));
        let closure =
            follow_relationships(&registry, &store, [book], FollowOptions::default(), &mut changes)
                .unwrap();
        assert_eq!(closure[&author_ref].action, Action::Addition);
        assert_eq!(changes[&author_ref].action, Action::Addition);
    }

    #[test]
    fn test_non_reference_value_is_invalid_relationship() {
        let (registry, mut store) = setup();
        let book = save(&mut store, Record::new("Book").with_field("author", "not a key"));

        let mut changes = HashMap::new();
        let err =
            follow_relationships(&registry, &store, [book], FollowOptions::default(), &mut changes)
                .unwrap_err();
        assert!(matches!(err, RevkeepError::InvalidRelationship { .. }));
    }

    #[test]
    fn test_ancestor_mode_collects_parent_fragments() {
        let catalog = Arc::new(
            Catalog::new()
                .with(TypeSchema::new("Place").field("address", FieldKind::Text))
                .with(
                    TypeSchema::new("Restaurant")
                        .inherits("Place", "place_ptr")
                        .field("cuisine", FieldKind::Text),
                ),
        );
        let registry = Registry::new(catalog.clone());
        let mut store = MemoryStore::new(catalog);
        let place = save(&mut store, Record::new("Place").with_field("address", "x"));
        let key = place.key.unwrap();
        let restaurant = save(
            &mut store,
            Record::new("Restaurant")
                .with_key(key)
                .with_field("place_ptr", key)
                .with_field("cuisine", "thai"),
        );

        let mut changes = HashMap::new();
        let closure = follow_relationships(
            &registry,
            &store,
            [restaurant],
            FollowOptions::ancestors(),
            &mut changes,
        )
        .unwrap();
        assert_eq!(closure.len(), 2);
        assert!(closure.contains_key(&ObjectRef::new("Place", key)));
        assert!(changes.is_empty());
    }
}
