use std::path::Path;
use std::sync::Arc;

use revkeep_core::model::{FieldDef, FieldKind};
use revkeep_core::{Catalog, RegisterOptions, Registry, RevisionManager, TypeSchema};
use revkeep_store::SqliteStore;

/// Pages with notes and tags, an actor type and one composite entity
#[allow(dead_code)]
pub fn catalog() -> Catalog {
    Catalog::new()
        .with(
            TypeSchema::new("User")
                .actor()
                .repr_field("username")
                .field("username", FieldKind::Text),
        )
        .with(
            TypeSchema::new("Tag")
                .repr_field("name")
                .field("name", FieldKind::Text),
        )
        .with(
            TypeSchema::new("Page")
                .repr_field("name")
                .field("name", FieldKind::Text)
                .reference_set("tags", "Tag"),
        )
        .with(
            TypeSchema::new("Note")
                .field("text", FieldKind::Text)
                .field_def(
                    FieldDef::new(
                        "page",
                        FieldKind::Reference {
                            target: "Page".into(),
                        },
                    )
                    .related_name("notes"),
                ),
        )
        .with(
            TypeSchema::new("Place")
                .repr_field("address")
                .field("address", FieldKind::Text),
        )
        .with(
            TypeSchema::new("Restaurant")
                .inherits("Place", "place_ptr")
                .field("cuisine", FieldKind::Text),
        )
}

#[allow(dead_code)]
pub fn registry() -> Registry {
    let mut registry = Registry::new(Arc::new(catalog()));
    registry.register("Tag", RegisterOptions::new()).unwrap();
    registry
        .register("Page", RegisterOptions::new().follow(["notes"]))
        .unwrap();
    registry
        .register("Note", RegisterOptions::new().follow(["page"]))
        .unwrap();
    registry.register("Place", RegisterOptions::new()).unwrap();
    registry.register("Restaurant", RegisterOptions::new()).unwrap();
    registry
}

/// Manager plus an in-memory SQLite store
#[allow(dead_code)]
pub fn setup() -> (RevisionManager, SqliteStore) {
    let registry = registry();
    let store = SqliteStore::open_in_memory(registry.catalog_arc()).unwrap();
    (RevisionManager::new(Arc::new(registry)), store)
}

/// Manager plus a store backed by a database file
#[allow(dead_code)]
pub fn setup_file(path: &Path) -> (RevisionManager, SqliteStore) {
    let registry = registry();
    let store = SqliteStore::open(path, registry.catalog_arc()).unwrap();
    (RevisionManager::new(Arc::new(registry)), store)
}
