//! Record catalog: the model metadata the engine reads
//!
//! A [`Catalog`] describes every record type the application stores: its
//! fields, its composite-entity parents (multi-table inheritance, one
//! fragment per type sharing the key), whether it is a shadow of another
//! type (same storage, different behaviour) and which type represents
//! actors.

use std::collections::{BTreeMap, BTreeSet};

use revkeep_core_types::TypeName;
use serde::{Deserialize, Serialize};

use super::record::Record;
use crate::errors::{Result, RevkeepError};

/// Storage kind of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    Integer,
    Float,
    Text,
    #[serde(rename = "datetime")]
    DateTime,
    File,
    /// Single reference to a record of `target`
    Reference { target: TypeName },
    /// Set of references to records of `target`
    ReferenceSet { target: TypeName },
}

impl FieldKind {
    /// Target type of a relational field
    pub fn target(&self) -> Option<&TypeName> {
        match self {
            FieldKind::Reference { target } | FieldKind::ReferenceSet { target } => Some(target),
            _ => None,
        }
    }

    pub fn is_relational(&self) -> bool {
        self.target().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Identity-key fields (such as composite parent links) never show in diffs
    #[serde(default)]
    pub primary_key: bool,
    /// Name of the reverse accessor on the target type
    #[serde(default)]
    pub related_name: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            primary_key: false,
            related_name: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn related_name(mut self, name: impl Into<String>) -> Self {
        self.related_name = Some(name.into());
        self
    }
}

/// Composite-entity link from a type to one of its parents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub parent: TypeName,
    /// Primary-key field on the child holding the shared key
    pub link_field: String,
}

/// Metadata of one record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSchema {
    pub name: TypeName,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub parents: Vec<ParentLink>,
    /// Set for shadow types, which share storage with their base type
    #[serde(default)]
    pub proxy_for: Option<TypeName>,
    /// Marks the type whose records act as revision authors
    #[serde(default)]
    pub actor: bool,
    /// Field used as the human-readable name in representation strings
    #[serde(default)]
    pub repr_field: Option<String>,
}

impl TypeSchema {
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            parents: Vec::new(),
            proxy_for: None,
            actor: false,
            repr_field: None,
        }
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef::new(name, kind));
        self
    }

    pub fn field_def(mut self, def: FieldDef) -> Self {
        self.fields.push(def);
        self
    }

    pub fn reference(self, name: impl Into<String>, target: impl Into<TypeName>) -> Self {
        self.field(
            name,
            FieldKind::Reference {
                target: target.into(),
            },
        )
    }

    pub fn reference_set(self, name: impl Into<String>, target: impl Into<TypeName>) -> Self {
        self.field(
            name,
            FieldKind::ReferenceSet {
                target: target.into(),
            },
        )
    }

    /// Declare a composite parent; adds the primary-key link field
    pub fn inherits(mut self, parent: impl Into<TypeName>, link_field: impl Into<String>) -> Self {
        let parent = parent.into();
        let link_field = link_field.into();
        self.fields.push(
            FieldDef::new(
                link_field.clone(),
                FieldKind::Reference {
                    target: parent.clone(),
                },
            )
            .primary_key(),
        );
        self.parents.push(ParentLink { parent, link_field });
        self
    }

    pub fn proxy_for(mut self, base: impl Into<TypeName>) -> Self {
        self.proxy_for = Some(base.into());
        self
    }

    pub fn actor(mut self) -> Self {
        self.actor = true;
        self
    }

    pub fn repr_field(mut self, field: impl Into<String>) -> Self {
        self.repr_field = Some(field.into());
        self
    }

    pub fn own_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A field together with the type that declares it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnedField<'a> {
    pub owner: &'a TypeName,
    pub def: &'a FieldDef,
}

/// All record types known to the application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    types: BTreeMap<TypeName, TypeSchema>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Catalog::insert`]
    pub fn with(mut self, schema: TypeSchema) -> Self {
        self.insert(schema);
        self
    }

    /// Add or replace a type
    pub fn insert(&mut self, schema: TypeSchema) {
        self.types.insert(schema.name.clone(), schema);
    }

    pub fn contains(&self, type_name: &TypeName) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeSchema> {
        self.types.values()
    }

    /// # Errors
    ///
    /// Returns `UnknownType` if the catalog has no such type.
    pub fn get(&self, type_name: &TypeName) -> Result<&TypeSchema> {
        self.types
            .get(type_name)
            .ok_or_else(|| RevkeepError::UnknownType {
                type_name: type_name.to_string(),
            })
    }

    /// All composite ancestors, nearest first, each listed once
    ///
    /// A shadow type has the ancestors of its base.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType` if the type or one of its ancestors is missing.
    pub fn ancestors(&self, type_name: &TypeName) -> Result<Vec<TypeName>> {
        self.get(type_name)?;
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut frontier = vec![self.storage_type(type_name)];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for current in frontier {
                for link in &self.get(&current)?.parents {
                    if seen.insert(link.parent.clone()) {
                        out.push(link.parent.clone());
                        next.push(link.parent.clone());
                    }
                }
            }
            frontier = next;
        }
        Ok(out)
    }

    /// Length of the longest parent chain above the type (0 for a root type)
    ///
    /// Unknown types count as roots.
    pub fn depth(&self, type_name: &TypeName) -> usize {
        self.depth_guarded(&self.storage_type(type_name), &mut BTreeSet::new())
    }

    fn depth_guarded(&self, type_name: &TypeName, stack: &mut BTreeSet<TypeName>) -> usize {
        let Some(schema) = self.types.get(type_name) else {
            return 0;
        };
        if !stack.insert(type_name.clone()) {
            return 0;
        }
        let depth = schema
            .parents
            .iter()
            .map(|link| 1 + self.depth_guarded(&link.parent, stack))
            .max()
            .unwrap_or(0);
        stack.remove(type_name);
        depth
    }

    /// Every field of the type, inherited fields first
    ///
    /// A shadow type has the fields of its base.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType` if the type or one of its ancestors is missing.
    pub fn all_fields(&self, type_name: &TypeName) -> Result<Vec<OwnedField<'_>>> {
        let mut chain = self.ancestors(type_name)?;
        chain.sort_by_key(|t| self.depth(t));
        chain.push(self.storage_type(type_name));

        let mut out = Vec::new();
        for owner in chain {
            let schema = self.get(&owner)?;
            out.extend(schema.fields.iter().map(|def| OwnedField {
                owner: &schema.name,
                def,
            }));
        }
        Ok(out)
    }

    /// Look a field up on the type or, failing that, on its ancestors
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` when no type in the chain declares it.
    pub fn find_field(&self, type_name: &TypeName, field: &str) -> Result<OwnedField<'_>> {
        self.get(type_name)?;
        let schema = self.get(&self.storage_type(type_name))?;
        if let Some(def) = schema.own_field(field) {
            return Ok(OwnedField {
                owner: &schema.name,
                def,
            });
        }
        for ancestor in self.ancestors(type_name)? {
            let schema = self.get(&ancestor)?;
            if let Some(def) = schema.own_field(field) {
                return Ok(OwnedField {
                    owner: &schema.name,
                    def,
                });
            }
        }
        Err(RevkeepError::UnknownField {
            type_name: type_name.to_string(),
            field: field.to_string(),
        })
    }

    pub fn is_shadow(&self, type_name: &TypeName) -> bool {
        self.types
            .get(type_name)
            .is_some_and(|s| s.proxy_for.is_some())
    }

    /// The type whose storage holds records of `type_name`
    pub fn storage_type(&self, type_name: &TypeName) -> TypeName {
        let mut current = type_name.clone();
        let mut seen = BTreeSet::new();
        while let Some(base) = self
            .types
            .get(&current)
            .and_then(|s| s.proxy_for.clone())
        {
            if !seen.insert(current.clone()) {
                break;
            }
            current = base;
        }
        current
    }

    /// Resolve a reverse accessor name declared against `type_name`
    ///
    /// Matches relational fields of any type that target `type_name`, its
    /// storage type or one of its ancestors, by `related_name` or by the
    /// default `"{source}_set"` name. Returns (source type, field name).
    pub fn reverse_accessor(&self, type_name: &TypeName, name: &str) -> Option<(TypeName, String)> {
        let mut targets = vec![type_name.clone(), self.storage_type(type_name)];
        targets.extend(self.ancestors(type_name).unwrap_or_default());

        for schema in self.types.values() {
            for def in &schema.fields {
                let Some(target) = def.kind.target() else {
                    continue;
                };
                if def.primary_key || !targets.contains(target) {
                    continue;
                }
                let accessor = def
                    .related_name
                    .clone()
                    .unwrap_or_else(|| format!("{}_set", schema.name.as_str().to_lowercase()));
                if accessor == name {
                    return Some((schema.name.clone(), def.name.clone()));
                }
            }
        }
        None
    }

    pub fn actor_type(&self) -> Option<&TypeName> {
        self.types.values().find(|s| s.actor).map(|s| &s.name)
    }

    /// Human-readable name of a record, e.g. `Home` or `Page object (3)`
    pub fn display_name(&self, record: &Record) -> String {
        // repr_field is inherited from the storage type and from ancestors
        let repr_field = [
            record.type_name.clone(),
            self.storage_type(&record.type_name),
        ]
        .into_iter()
        .chain(self.ancestors(&record.type_name).unwrap_or_default())
        .find_map(|t| self.types.get(&t).and_then(|s| s.repr_field.clone()));
        let named = repr_field
            .as_deref()
            .and_then(|f| record.get(f))
            .filter(|v| !v.is_empty());
        match (named, record.key) {
            (Some(value), _) => value.to_string(),
            (None, Some(key)) => format!("{} object ({})", record.type_name, key),
            (None, None) => format!("{} object (None)", record.type_name),
        }
    }

    /// Representation string stored with each version: `<Type: name>`
    pub fn repr(&self, record: &Record) -> String {
        format!("<{}: {}>", record.type_name, self.display_name(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldValue;

    fn catalog() -> Catalog {
        Catalog::new()
            .with(
                TypeSchema::new("Content")
                    .field("title", FieldKind::Text)
                    .repr_field("title"),
            )
            .with(
                TypeSchema::new("Page")
                    .inherits("Content", "content_ptr")
                    .field("body", FieldKind::Text)
                    .reference("author", "User"),
            )
            .with(TypeSchema::new("DraftPage").proxy_for("Page"))
            .with(
                TypeSchema::new("User")
                    .field("username", FieldKind::Text)
                    .actor()
                    .repr_field("username"),
            )
            .with(
                TypeSchema::new("Comment")
                    .reference("page", "Content")
                    .field_def(
                        FieldDef::new(
                            "owner",
                            FieldKind::Reference {
                                target: "User".into(),
                            },
                        )
                        .related_name("comments"),
                    ),
            )
    }

    #[test]
    fn test_all_fields_lists_inherited_first() {
        let catalog = catalog();
        let names: Vec<&str> = catalog
            .all_fields(&"Page".into())
            .unwrap()
            .iter()
            .map(|f| f.def.name.as_str())
            .collect();
        assert_eq!(names, vec!["title", "content_ptr", "body", "author"]);
    }

    #[test]
    fn test_find_field_walks_ancestors() {
        let catalog = catalog();
        let field = catalog.find_field(&"Page".into(), "title").unwrap();
        assert_eq!(field.owner.as_str(), "Content");

        let err = catalog.find_field(&"Page".into(), "nope").unwrap_err();
        assert!(matches!(err, RevkeepError::UnknownField { .. }));
    }

    #[test]
    fn test_depth_and_storage_type() {
        let catalog = catalog();
        assert_eq!(catalog.depth(&"Content".into()), 0);
        assert_eq!(catalog.depth(&"Page".into()), 1);
        assert_eq!(catalog.storage_type(&"DraftPage".into()).as_str(), "Page");
        assert!(catalog.is_shadow(&"DraftPage".into()));
    }

    #[test]
    fn test_reverse_accessor_default_and_named() {
        let catalog = catalog();
        assert_eq!(
            catalog.reverse_accessor(&"Page".into(), "comment_set"),
            Some(("Comment".into(), "page".to_string()))
        );
        assert_eq!(
            catalog.reverse_accessor(&"User".into(), "comments"),
            Some(("Comment".into(), "owner".to_string()))
        );
        assert_eq!(catalog.reverse_accessor(&"User".into(), "comment_set"), None);
    }

    #[test]
    fn test_repr_uses_repr_field_or_fallback() {
        let catalog = catalog();
        let user = Record::new("User")
            .with_key(1)
            .with_field("username", "ada");
        assert_eq!(catalog.repr(&user), "<User: ada>");

        let page = Record::new("Page").with_key(4).with_field("body", FieldValue::Null);
        assert_eq!(catalog.repr(&page), "<Page: Page object (4)>");
        assert_eq!(catalog.actor_type().map(|t| t.as_str()), Some("User"));
    }
}
