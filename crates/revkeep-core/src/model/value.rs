use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use revkeep_core_types::ObjectKey;
use serde::{Deserialize, Serialize};

/// A single field value of a live record or a captured snapshot
///
/// References hold keys only; the target is resolved against the store
/// whenever it is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(DateTime<Utc>),
    /// Path of an attached file
    File(String),
    Ref(ObjectKey),
    RefSet(BTreeSet<ObjectKey>),
}

impl FieldValue {
    /// Falsy values: null, empty text or path, false, zero and the empty set
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Bool(b) => !b,
            FieldValue::Int(i) => *i == 0,
            FieldValue::Float(f) => *f == 0.0,
            FieldValue::Text(s) | FieldValue::File(s) => s.is_empty(),
            FieldValue::DateTime(_) | FieldValue::Ref(_) => false,
            FieldValue::RefSet(keys) => keys.is_empty(),
        }
    }

    /// Short name of the variant, used in error messages
    pub fn type_label(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "text",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::File(_) => "file",
            FieldValue::Ref(_) => "ref",
            FieldValue::RefSet(_) => "ref_set",
        }
    }

    pub fn as_ref_key(&self) -> Option<ObjectKey> {
        match self {
            FieldValue::Ref(key) => Some(*key),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Both values are datetimes falling within the same whole second
    pub fn same_second(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => a.timestamp() == b.timestamp(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "None"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Text(s) | FieldValue::File(s) => write!(f, "{}", s),
            FieldValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            FieldValue::Ref(key) => write!(f, "{}", key),
            FieldValue::RefSet(keys) => {
                let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
                write!(f, "[{}]", keys.join(", "))
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Float(x)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(dt: DateTime<Utc>) -> Self {
        FieldValue::DateTime(dt)
    }
}

impl From<ObjectKey> for FieldValue {
    fn from(key: ObjectKey) -> Self {
        FieldValue::Ref(key)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_emptiness_follows_truthiness() {
        assert!(FieldValue::Null.is_empty());
        assert!(FieldValue::from("").is_empty());
        assert!(FieldValue::from(false).is_empty());
        assert!(FieldValue::from(0i64).is_empty());
        assert!(FieldValue::from(0.0).is_empty());
        assert!(FieldValue::RefSet(BTreeSet::new()).is_empty());

        assert!(!FieldValue::from("x").is_empty());
        assert!(!FieldValue::Ref(ObjectKey::new(0)).is_empty());
    }

    #[test]
    fn test_same_second_ignores_subsecond_noise() {
        let a = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(400);
        let c = a + chrono::Duration::seconds(1);
        assert!(FieldValue::from(a).same_second(&FieldValue::from(b)));
        assert!(!FieldValue::from(a).same_second(&FieldValue::from(c)));
        assert!(!FieldValue::from(a).same_second(&FieldValue::Null));
    }

    #[test]
    fn test_json_shape_is_tagged() {
        let json = serde_json::to_string(&FieldValue::from("x")).unwrap();
        assert_eq!(json, r#"{"kind":"text","value":"x"}"#);
        let json = serde_json::to_string(&FieldValue::Null).unwrap();
        assert_eq!(json, r#"{"kind":"null"}"#);
    }

    #[test]
    fn test_display_ref_set() {
        let set: BTreeSet<ObjectKey> = [3, 1].into_iter().map(ObjectKey::new).collect();
        assert_eq!(FieldValue::RefSet(set).to_string(), "[1, 3]");
    }
}
