//! Snapshot encoding
//!
//! A version's payload is the list of fragments of one object: its own
//! record plus one fragment per composite ancestor, each restricted to the
//! registered field whitelist. JSON and YAML share the same shape.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use revkeep_core_types::{ObjectKey, TypeName};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, RevkeepError};
use crate::model::{Catalog, FieldValue, Record, Version};

/// Payload encoding of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Yaml,
}

impl Format {
    pub fn tag(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Format {
    type Err = RevkeepError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag {
            "json" => Ok(Format::Json),
            "yaml" => Ok(Format::Yaml),
            other => Err(RevkeepError::UnknownFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// One type's share of a serialized object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(rename = "type")]
    pub type_name: TypeName,
    pub key: ObjectKey,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Fragment {
    pub fn into_record(self) -> Record {
        Record {
            type_name: self.type_name,
            key: Some(self.key),
            fields: self.fields,
        }
    }
}

/// Serialize records, keeping only whitelisted fields
///
/// # Errors
///
/// Returns `MissingKey` for an unsaved record, `Serialization` for a NaN or
/// infinite float or if the encoder fails.
pub fn encode(format: Format, records: &[Record], whitelist: &[String]) -> Result<String> {
    let fragments = records
        .iter()
        .map(|record| {
            let key = record.key.ok_or_else(|| RevkeepError::MissingKey {
                type_name: record.type_name.to_string(),
            })?;
            let fields = record
                .fields
                .iter()
                .filter(|(name, _)| whitelist.iter().any(|w| w == *name))
                .map(|(name, value)| match value {
                    // Non-finite floats serialize as null and never decode
                    FieldValue::Float(f) if !f.is_finite() => Err(RevkeepError::Serialization {
                        message: format!(
                            "{}.{} holds non-finite float {}",
                            record.type_name, name, f
                        ),
                    }),
                    _ => Ok((name.clone(), value.clone())),
                })
                .collect::<Result<BTreeMap<_, _>>>()?;
            Ok(Fragment {
                type_name: record.type_name.clone(),
                key,
                fields,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    match format {
        Format::Json => Ok(serde_json::to_string(&fragments)?),
        Format::Yaml => Ok(serde_yaml::to_string(&fragments)?),
    }
}

/// # Errors
///
/// Returns `Serialization` if the payload is malformed.
pub fn decode(format: Format, payload: &str) -> Result<Vec<Fragment>> {
    match format {
        Format::Json => Ok(serde_json::from_str(payload)?),
        Format::Yaml => Ok(serde_yaml::from_str(payload)?),
    }
}

/// Decode a stored version using its own format tag
///
/// # Errors
///
/// Returns `UnknownFormat` for an unrecognised tag, `Serialization` for a
/// malformed payload.
pub fn decode_version(version: &Version) -> Result<Vec<Fragment>> {
    decode(version.format.parse()?, &version.serialized_data)
}

/// Merge fragments into one record of the most-derived type
///
/// Fragments are applied least-derived first, so a more-derived fragment
/// wins when two declare the same field name.
///
/// # Errors
///
/// Returns `Serialization` when there are no fragments.
pub fn reconstruct(catalog: &Catalog, fragments: &[Fragment]) -> Result<Record> {
    let mut ordered: Vec<&Fragment> = fragments.iter().collect();
    ordered.sort_by_key(|f| catalog.depth(&f.type_name));

    let most_derived = ordered.last().ok_or_else(|| RevkeepError::Serialization {
        message: "snapshot payload contains no fragments".to_string(),
    })?;
    let mut record = Record::new(most_derived.type_name.clone()).with_key(most_derived.key);
    for fragment in ordered {
        for (name, value) in &fragment.fields {
            record.fields.insert(name.clone(), value.clone());
        }
    }
    Ok(record)
}

/// Decode a version straight into its reconstructed record
///
/// # Errors
///
/// Propagates decoding and reconstruction errors.
pub fn version_record(catalog: &Catalog, version: &Version) -> Result<Record> {
    reconstruct(catalog, &decode_version(version)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldKind, TypeSchema};

    #[test]
    fn test_non_finite_float_is_rejected() {
        let whitelist = vec!["x".to_string()];
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let record = Record::new("M").with_key(ObjectKey::new(1)).with_field("x", bad);
            for format in [Format::Json, Format::Yaml] {
                let err = encode(format, &[record.clone()], &whitelist).unwrap_err();
                assert!(matches!(err, RevkeepError::Serialization { .. }));
            }
        }

        // Excluded fields are never inspected
        let record = Record::new("M")
            .with_key(ObjectKey::new(1))
            .with_field("x", 1.5)
            .with_field("y", f64::NAN);
        let payload = encode(Format::Json, &[record], &whitelist).unwrap();
        let fragments = decode(Format::Json, &payload).unwrap();
        assert_eq!(fragments[0].fields.get("x"), Some(&FieldValue::Float(1.5)));
    }

    fn catalog() -> Catalog {
        Catalog::new()
            .with(TypeSchema::new("Base").field("name", FieldKind::Text))
            .with(
                TypeSchema::new("Child")
                    .inherits("Base", "base_ptr")
                    .field("name", FieldKind::Text),
            )
    }

    #[test]
    fn test_encode_applies_whitelist() {
        let record = Record::new("Base")
            .with_key(1)
            .with_field("name", "x")
            .with_field("secret", "hidden");
        let payload = encode(Format::Json, &[record], &["name".to_string()]).unwrap();
        let fragments = decode(Format::Json, &payload).unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].fields.contains_key("name"));
        assert!(!fragments[0].fields.contains_key("secret"));
    }

    #[test]
    fn test_encode_rejects_unsaved_record() {
        let err = encode(Format::Json, &[Record::new("Base")], &[]).unwrap_err();
        assert!(matches!(err, RevkeepError::MissingKey { .. }));
    }

    #[test]
    fn test_reconstruct_more_derived_fragment_wins() {
        let catalog = catalog();
        let child = Record::new("Child").with_key(5).with_field("name", "child");
        let base = Record::new("Base").with_key(5).with_field("name", "base");
        let whitelist = vec!["name".to_string()];

        // Order in the payload must not matter
        for records in [vec![child.clone(), base.clone()], vec![base, child]] {
            let payload = encode(Format::Yaml, &records, &whitelist).unwrap();
            let record = reconstruct(&catalog, &decode(Format::Yaml, &payload).unwrap()).unwrap();
            assert_eq!(record.type_name.as_str(), "Child");
            assert_eq!(record.get("name"), Some(&FieldValue::from("child")));
        }
    }

    #[test]
    fn test_unknown_format_tag() {
        let err = "xml".parse::<Format>().unwrap_err();
        assert_eq!(
            err,
            RevkeepError::UnknownFormat {
                format: "xml".to_string()
            }
        );
        assert_eq!("yaml".parse::<Format>().unwrap(), Format::Yaml);
    }

    #[test]
    fn test_reconstruct_empty_payload_fails() {
        let err = reconstruct(&catalog(), &[]).unwrap_err();
        assert!(matches!(err, RevkeepError::Serialization { .. }));
    }
}
