//! Type registry: which record types are versioned and how
//!
//! Registration resolves follow names once into typed [`Relation`]
//! descriptors so traversal never has to interpret names again. The
//! registry is built before any scope runs and then shared read-only.

use std::collections::BTreeMap;
use std::sync::Arc;

use revkeep_core_types::TypeName;

use crate::codec::Format;
use crate::errors::{Result, RevkeepError};
use crate::model::{Catalog, FieldKind};

/// How a relation reaches its neighbours
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// Single reference field
    Forward { field: String, target: TypeName },
    /// Reference-set field
    Many { field: String, target: TypeName },
    /// Records of `source` whose `field` points back at this record
    Reverse { source: TypeName, field: String },
}

/// A followed relationship of a registered type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Follow name as given at registration
    pub name: String,
    /// Type whose fragment holds the field (an ancestor for inherited fields)
    pub owner: TypeName,
    pub kind: RelationKind,
}

/// Settings of one registered type
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub type_name: TypeName,
    /// Field whitelist, inherited fields included
    pub fields: Vec<String>,
    /// Whitelisted file fields
    pub file_fields: Vec<String>,
    pub follow: Vec<Relation>,
    pub format: Format,
}

/// Options accepted by [`Registry::register`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Explicit whitelist; all catalog fields when `None`
    pub fields: Option<Vec<String>>,
    pub follow: Vec<String>,
    pub format: Format,
    pub exclude_fields: Vec<String>,
}

impl RegisterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn follow<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.follow = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    catalog: Arc<Catalog>,
    entries: BTreeMap<TypeName, Registration>,
}

impl Registry {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            entries: BTreeMap::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_arc(&self) -> Arc<Catalog> {
        self.catalog.clone()
    }

    /// Register a type for versioning
    ///
    /// # Errors
    ///
    /// - `UnknownType` if the catalog lacks the type
    /// - `AlreadyRegistered` on a duplicate registration
    /// - `NotRegistered` if the type is a shadow whose base is unregistered
    /// - `UnknownField` for an explicit field the type does not have
    /// - `InvalidRelationship` for a follow name that is not a relationship
    pub fn register(
        &mut self,
        type_name: impl Into<TypeName>,
        options: RegisterOptions,
    ) -> Result<&Registration> {
        let type_name = type_name.into();
        self.catalog.get(&type_name)?;
        if self.entries.contains_key(&type_name) {
            return Err(RevkeepError::AlreadyRegistered {
                type_name: type_name.to_string(),
            });
        }
        if self.catalog.is_shadow(&type_name) {
            let base = self.catalog.storage_type(&type_name);
            if !self.entries.contains_key(&base) {
                return Err(RevkeepError::NotRegistered {
                    type_name: base.to_string(),
                });
            }
        }

        let mut fields = match options.fields {
            Some(fields) => {
                for field in &fields {
                    self.catalog.find_field(&type_name, field)?;
                }
                fields
            }
            None => self
                .catalog
                .all_fields(&type_name)?
                .iter()
                .map(|f| f.def.name.clone())
                .collect(),
        };
        fields.retain(|f| !options.exclude_fields.contains(f));
        fields.dedup();

        let file_fields = fields
            .iter()
            .filter(|f| {
                self.catalog
                    .find_field(&type_name, f)
                    .is_ok_and(|owned| owned.def.kind == FieldKind::File)
            })
            .cloned()
            .collect();

        let follow = options
            .follow
            .iter()
            .map(|name| self.resolve_relation(&type_name, name))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            type_name = %type_name,
            field_count = fields.len(),
            follow_count = follow.len(),
            "registered type for versioning"
        );

        let registration = Registration {
            type_name: type_name.clone(),
            fields,
            file_fields,
            follow,
            format: options.format,
        };
        Ok(self.entries.entry(type_name).or_insert(registration))
    }

    fn resolve_relation(&self, type_name: &TypeName, name: &str) -> Result<Relation> {
        let invalid = |found: &str| RevkeepError::InvalidRelationship {
            relationship: format!("{}.{}", type_name, name),
            found: found.to_string(),
        };

        if let Ok(owned) = self.catalog.find_field(type_name, name) {
            let kind = match &owned.def.kind {
                FieldKind::Reference { target } => RelationKind::Forward {
                    field: owned.def.name.clone(),
                    target: target.clone(),
                },
                FieldKind::ReferenceSet { target } => RelationKind::Many {
                    field: owned.def.name.clone(),
                    target: target.clone(),
                },
                other => return Err(invalid(&format!("{:?} field", other))),
            };
            return Ok(Relation {
                name: name.to_string(),
                owner: owned.owner.clone(),
                kind,
            });
        }

        match self.catalog.reverse_accessor(type_name, name) {
            Some((source, field)) => Ok(Relation {
                name: name.to_string(),
                owner: type_name.clone(),
                kind: RelationKind::Reverse { source, field },
            }),
            None => Err(invalid("no such field or accessor")),
        }
    }

    /// # Errors
    ///
    /// Returns `NotRegistered` if the type is not registered.
    pub fn unregister(&mut self, type_name: &TypeName) -> Result<Registration> {
        self.entries
            .remove(type_name)
            .ok_or_else(|| RevkeepError::NotRegistered {
                type_name: type_name.to_string(),
            })
    }

    pub fn is_registered(&self, type_name: &TypeName) -> bool {
        self.entries.contains_key(type_name)
    }

    /// # Errors
    ///
    /// Returns `NotRegistered` if the type is not registered.
    pub fn registration(&self, type_name: &TypeName) -> Result<&Registration> {
        self.entries
            .get(type_name)
            .ok_or_else(|| RevkeepError::NotRegistered {
                type_name: type_name.to_string(),
            })
    }

    pub fn registered_types(&self) -> impl Iterator<Item = &TypeName> {
        self.entries.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeSchema;

    fn registry() -> Registry {
        let catalog = Catalog::new()
            .with(
                TypeSchema::new("Content")
                    .field("title", FieldKind::Text)
                    .field("attachment", FieldKind::File),
            )
            .with(
                TypeSchema::new("Page")
                    .inherits("Content", "content_ptr")
                    .field("body", FieldKind::Text)
                    .reference("author", "User")
                    .reference_set("tags", "Tag"),
            )
            .with(TypeSchema::new("DraftPage").proxy_for("Page"))
            .with(TypeSchema::new("User").field("username", FieldKind::Text))
            .with(TypeSchema::new("Tag").field("label", FieldKind::Text));
        Registry::new(Arc::new(catalog))
    }

    #[test]
    fn test_default_fields_include_inherited_and_exclusions_apply() {
        let mut registry = registry();
        let registration = registry
            .register("Page", RegisterOptions::new().exclude(["body"]))
            .unwrap();
        assert_eq!(
            registration.fields,
            vec!["title", "attachment", "content_ptr", "author", "tags"]
        );
        assert_eq!(registration.file_fields, vec!["attachment"]);
        assert_eq!(registration.format, Format::Json);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = registry();
        registry.register("User", RegisterOptions::new()).unwrap();
        let err = registry
            .register("User", RegisterOptions::new())
            .unwrap_err();
        assert!(matches!(err, RevkeepError::AlreadyRegistered { .. }));
    }

    #[test]
    fn test_shadow_requires_registered_base() {
        let mut registry = registry();
        let err = registry
            .register("DraftPage", RegisterOptions::new())
            .unwrap_err();
        assert_eq!(
            err,
            RevkeepError::NotRegistered {
                type_name: "Page".to_string()
            }
        );

        registry.register("Page", RegisterOptions::new()).unwrap();
        assert!(registry.register("DraftPage", RegisterOptions::new()).is_ok());
    }

    #[test]
    fn test_follow_names_resolve_to_relations() {
        let mut registry = registry();
        registry
            .register("User", RegisterOptions::new().follow(["page_set"]))
            .unwrap();
        let registration = registry
            .register("Page", RegisterOptions::new().follow(["author", "tags"]))
            .unwrap();

        assert_eq!(
            registration.follow[0].kind,
            RelationKind::Forward {
                field: "author".to_string(),
                target: "User".into()
            }
        );
        assert!(matches!(registration.follow[1].kind, RelationKind::Many { .. }));

        let user = registry.registration(&"User".into()).unwrap();
        assert_eq!(
            user.follow[0].kind,
            RelationKind::Reverse {
                source: "Page".into(),
                field: "author".to_string()
            }
        );
    }

    #[test]
    fn test_follow_of_plain_field_is_invalid() {
        let mut registry = registry();
        let err = registry
            .register("Page", RegisterOptions::new().follow(["body"]))
            .unwrap_err();
        assert!(matches!(err, RevkeepError::InvalidRelationship { .. }));

        let err = registry
            .register("Page", RegisterOptions::new().follow(["missing"]))
            .unwrap_err();
        assert!(matches!(err, RevkeepError::InvalidRelationship { .. }));
    }

    #[test]
    fn test_unknown_type_and_unregister() {
        let mut registry = registry();
        let err = registry
            .register("Nope", RegisterOptions::new())
            .unwrap_err();
        assert!(matches!(err, RevkeepError::UnknownType { .. }));

        registry.register("Tag", RegisterOptions::new()).unwrap();
        assert!(registry.is_registered(&"Tag".into()));
        registry.unregister(&"Tag".into()).unwrap();
        assert!(!registry.is_registered(&"Tag".into()));
        assert!(registry.registration(&"Tag".into()).is_err());
    }
}
