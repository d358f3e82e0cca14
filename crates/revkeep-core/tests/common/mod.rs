use std::sync::Arc;

use revkeep_core::model::{FieldDef, FieldKind};
use revkeep_core::{
    Catalog, MemoryStore, Record, RecordStore, RegisterOptions, Registry, RevisionManager,
    TypeSchema,
};

/// A small publishing catalog
///
/// - `User` is the actor type
/// - `Page` references its author and a set of tags; notes point back at it
/// - `Restaurant` is a composite entity extending `Place`
/// - `PageProxy` shares storage with `Page`
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
                .field("published", FieldKind::DateTime)
                .reference("author", "User")
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
        .with(TypeSchema::new("PageProxy").proxy_for("Page"))
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

/// Registry with every content type registered
///
/// Pages follow their tags and notes; notes follow their page, so the
/// relationship graph holds a cycle.
#[allow(dead_code)]
pub fn registry() -> Registry {
    let mut registry = Registry::new(Arc::new(catalog()));
    registry.register("Tag", RegisterOptions::new()).unwrap();
    registry
        .register("Page", RegisterOptions::new().follow(["tags", "notes"]))
        .unwrap();
    registry
        .register("Note", RegisterOptions::new().follow(["page"]))
        .unwrap();
    registry.register("PageProxy", RegisterOptions::new()).unwrap();
    registry.register("Place", RegisterOptions::new()).unwrap();
    registry.register("Restaurant", RegisterOptions::new()).unwrap();
    registry
}

/// Fresh manager and empty store over [`registry`]
#[allow(dead_code)]
pub fn setup() -> (RevisionManager, MemoryStore) {
    let registry = registry();
    let store = MemoryStore::new(registry.catalog_arc());
    (RevisionManager::new(Arc::new(registry)), store)
}

/// Save without tracking
#[allow(dead_code)]
pub fn insert(store: &mut MemoryStore, mut record: Record) -> Record {
    store.save(&mut record).unwrap();
    record
}
