use std::collections::BTreeMap;

use revkeep_core_types::{ObjectKey, ObjectRef, TypeName};
use serde::{Deserialize, Serialize};

use super::value::FieldValue;

/// A live object: its type, its key once saved, and its field values
///
/// For composite entities each type in the chain has its own record
/// (fragment) sharing the same key; a record only carries the fields its own
/// type declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub type_name: TypeName,
    pub key: Option<ObjectKey>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Create an unsaved record with no fields
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            key: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<ObjectKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Identity of this record, `None` until it has been saved
    pub fn object_ref(&self) -> Option<ObjectRef> {
        self.key.map(|key| ObjectRef::new(self.type_name.clone(), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_ref_requires_key() {
        let record = Record::new("Page").with_field("title", "Home");
        assert!(record.object_ref().is_none());

        let saved = record.with_key(3);
        assert_eq!(saved.object_ref(), Some(ObjectRef::new("Page", 3)));
        assert_eq!(saved.get("title"), Some(&FieldValue::from("Home")));
    }
}
