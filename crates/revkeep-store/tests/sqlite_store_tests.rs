#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::BTreeSet;

use revkeep_core::model::MetaRecord;
use revkeep_core::{
    Action, FieldValue, ObjectKey, Record, RecordStore, RevisionId, RevkeepError, TypeName,
    VersionStore,
};
use tempfile::TempDir;

#[test]
fn test_save_assigns_increasing_keys_that_are_never_reused() {
    // Given: An empty store
    let (_, mut store) = common::setup();

    // When: Two tags are saved and the second is removed
    let mut a = Record::new("Tag").with_field("name", "a");
    let mut b = Record::new("Tag").with_field("name", "b");
    store.save(&mut a).unwrap();
    store.save(&mut b).unwrap();
    assert_eq!(a.key, Some(ObjectKey::new(1)));
    assert_eq!(b.key, Some(ObjectKey::new(2)));
    assert!(store.remove(&"Tag".into(), ObjectKey::new(2)).unwrap());

    // Then: The next record gets a fresh key
    let mut c = Record::new("Tag").with_field("name", "c");
    store.save(&mut c).unwrap();
    assert_eq!(c.key, Some(ObjectKey::new(3)));

    // And: An explicit key moves the sequence past it
    let mut d = Record::new("Tag").with_key(ObjectKey::new(10)).with_field("name", "d");
    store.save(&mut d).unwrap();
    let mut e = Record::new("Tag").with_field("name", "e");
    store.save(&mut e).unwrap();
    assert_eq!(e.key, Some(ObjectKey::new(11)));
}

#[test]
fn test_record_fields_survive_storage() {
    let (_, mut store) = common::setup();
    let tags: BTreeSet<ObjectKey> = [ObjectKey::new(4), ObjectKey::new(9)].into_iter().collect();
    let mut page = Record::new("Page")
        .with_field("name", "Home")
        .with_field("tags", FieldValue::RefSet(tags));
    store.save(&mut page).unwrap();

    let loaded = store.get(&"Page".into(), page.key.unwrap()).unwrap().unwrap();
    assert_eq!(loaded, page);
    assert!(store.get(&"Page".into(), ObjectKey::new(99)).unwrap().is_none());
    assert!(!store.remove(&"Page".into(), ObjectKey::new(99)).unwrap());
}

#[test]
fn test_referencing_matches_single_and_set_references() {
    let (_, mut store) = common::setup();
    let mut page = Record::new("Page").with_field("name", "Home");
    store.save(&mut page).unwrap();
    let page_key = page.key.unwrap();

    let mut note = Record::new("Note").with_field("text", "a").with_field("page", page_key);
    store.save(&mut note).unwrap();
    let mut other = Record::new("Note").with_field("text", "b");
    store.save(&mut other).unwrap();

    let found = store.referencing(&"Note".into(), "page", page_key).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].key, note.key);
    assert_eq!(found[0].type_name, TypeName::new("Note"));
}

#[test]
fn test_scope_commit_round_trips_through_sqlite() {
    // Given: A scope saving a page with a note, an actor and metadata
    let (mut manager, mut store) = common::setup();
    let mut page = Record::new("Page").with_field("name", "Home");
    manager
        .run(&mut store, |m, s| {
            s.save_with(&mut page, m)?;
            let mut note = Record::new("Note")
                .with_field("text", "first")
                .with_field("page", page.key.unwrap());
            s.save_with(&mut note, m)?;
            m.set_user(Some(ObjectKey::new(7)))?;
            m.set_comment("initial import")?;
            m.add_meta(MetaRecord::new("ticket", serde_json::json!({"id": 42})))
        })
        .unwrap();
    let revision = store.revision(RevisionId::new(1)).unwrap().unwrap();

    // Then: The revision, its versions and its metadata are stored
    assert_eq!(revision.user, Some(ObjectKey::new(7)));
    assert_eq!(revision.comment, "initial import");
    let versions = store.revision_versions(revision.id).unwrap();
    assert_eq!(versions.len(), 2);
    assert!(versions.iter().all(|v| v.action == Action::Addition));
    assert!(versions.iter().any(|v| v.object_repr == "<Page: Home>"));

    let meta = store.revision_meta(revision.id).unwrap();
    assert_eq!(meta, vec![MetaRecord::new("ticket", serde_json::json!({"id": 42}))]);

    let by_id = store.version(versions[0].id).unwrap().unwrap();
    assert_eq!(by_id, versions[0]);
}

#[test]
fn test_empty_draft_is_rejected() {
    let (_, mut store) = common::setup();
    let draft = revkeep_core::model::RevisionDraft {
        created_at: chrono::Utc::now(),
        user: None,
        comment: String::new(),
        versions: Vec::new(),
        meta: Vec::new(),
    };
    assert_eq!(store.commit_revision(draft), Err(RevkeepError::EmptyRevision));
    assert!(store.revision(RevisionId::new(1)).unwrap().is_none());
}

#[test]
fn test_object_versions_and_keys_for_type() {
    let (mut manager, mut store) = common::setup();
    let mut tag = Record::new("Tag").with_field("name", "rust");
    manager
        .run(&mut store, |m, s| s.save_with(&mut tag, m))
        .unwrap();
    tag.set("name", "sqlite");
    manager
        .run(&mut store, |m, s| s.save_with(&mut tag, m))
        .unwrap();

    let key = tag.key.unwrap();
    let versions = store.object_versions(&"Tag".into(), key).unwrap();
    assert_eq!(versions.len(), 2);
    assert!(versions[0].id < versions[1].id);
    assert_eq!(versions[1].action, Action::Change);
    assert_eq!(store.object_keys_for_type(&"Tag".into()).unwrap(), vec![key]);
}

#[test]
fn test_delete_revision_removes_versions_and_meta() {
    let (mut manager, mut store) = common::setup();
    let mut tag = Record::new("Tag").with_field("name", "rust");
    manager
        .run(&mut store, |m, s| {
            m.add_meta(MetaRecord::new("note", serde_json::json!("x")))?;
            s.save_with(&mut tag, m)
        })
        .unwrap();

    assert!(store.delete_revision(RevisionId::new(1)).unwrap());
    assert!(store.revision(RevisionId::new(1)).unwrap().is_none());
    assert!(store.revision_versions(RevisionId::new(1)).unwrap().is_empty());
    assert!(store.revision_meta(RevisionId::new(1)).unwrap().is_empty());
    assert!(!store.delete_revision(RevisionId::new(1)).unwrap());
}

#[test]
fn test_composite_entity_is_stored_as_fragments() {
    let (mut manager, mut store) = common::setup();
    let mut place = Record::new("Place").with_field("address", "1 Main St");
    store.save(&mut place).unwrap();
    let key = place.key.unwrap();

    let mut restaurant = Record::new("Restaurant")
        .with_key(key)
        .with_field("cuisine", "thai");
    manager
        .run(&mut store, |m, s| s.save_with(&mut restaurant, m))
        .unwrap();

    let versions = store.revision_versions(RevisionId::new(1)).unwrap();
    let snapshot = versions
        .iter()
        .find(|v| v.type_name.as_str() == "Restaurant")
        .unwrap();
    assert_eq!(snapshot.object_repr, "<Restaurant: 1 Main St>");
    assert!(store.get(&"Place".into(), key).unwrap().is_some());
}

#[test]
fn test_file_database_keeps_history_across_reopen() {
    // Given: A revision committed to a database file
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    {
        let (mut manager, mut store) = common::setup_file(&path);
        let mut tag = Record::new("Tag").with_field("name", "rust");
        manager
            .run(&mut store, |m, s| s.save_with(&mut tag, m))
            .unwrap();
    }

    // When: The file is opened again
    let (_, mut store) = common::setup_file(&path);

    // Then: History and the key sequence are intact
    let versions = store.revision_versions(RevisionId::new(1)).unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].object_repr, "<Tag: rust>");
    let mut next = Record::new("Tag").with_field("name", "next");
    store.save(&mut next).unwrap();
    assert_eq!(next.key, Some(ObjectKey::new(2)));
}
