//! Schema file: the record catalog plus type registrations
//!
//! Parses YAML and validates schema version and registration targets. The
//! CLI loads one of these to know which types exist and how each registered
//! type is versioned.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use revkeep_core_types::TypeName;
use serde::{Deserialize, Serialize};

use crate::codec::Format;
use crate::errors::{Result, RevkeepError};
use crate::model::{Catalog, TypeSchema};
use crate::registry::{RegisterOptions, Registry};

/// Top-level schema file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Schema version (must be 0 for this format)
    pub schema_version: u32,

    /// Record types known to the store
    pub types: Vec<TypeSchema>,

    /// Types to version, registered in file order
    #[serde(default)]
    pub registrations: Vec<RegistrationConfig>,
}

/// One registration entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    pub name: TypeName,

    /// Explicit field whitelist; every catalog field when absent
    #[serde(default)]
    pub fields: Option<Vec<String>>,

    #[serde(default)]
    pub follow: Vec<String>,

    #[serde(default)]
    pub format: Format,

    #[serde(default)]
    pub exclude_fields: Vec<String>,
}

impl SchemaConfig {
    /// Parse and validate a schema from a string
    ///
    /// # Errors
    ///
    /// - `Serialization` for malformed YAML or an unsupported schema version
    /// - `UnknownType` for a registration naming a type not in `types`
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: SchemaConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a schema file
    ///
    /// # Errors
    ///
    /// Same as [`SchemaConfig::from_yaml_str`], plus `Persistence` when the
    /// file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RevkeepError::Persistence {
            op: "read_schema".to_string(),
            message: format!("Failed to read schema file {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.schema_version != 0 {
            return Err(RevkeepError::Serialization {
                message: format!(
                    "Unsupported schema_version: {}. Expected 0",
                    self.schema_version
                ),
            });
        }

        let mut names = HashSet::new();
        for schema in &self.types {
            if !names.insert(&schema.name) {
                return Err(RevkeepError::Serialization {
                    message: format!("Duplicate type {}", schema.name),
                });
            }
        }
        for registration in &self.registrations {
            if !names.contains(&registration.name) {
                return Err(RevkeepError::UnknownType {
                    type_name: registration.name.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn catalog(&self) -> Catalog {
        self.types
            .iter()
            .cloned()
            .fold(Catalog::new(), |catalog, schema| catalog.with(schema))
    }

    /// Build the catalog and register every configured type
    ///
    /// # Errors
    ///
    /// Propagates registration errors such as `NotRegistered` for a shadow
    /// type listed before its base.
    pub fn into_registry(self) -> Result<Registry> {
        let catalog = Arc::new(self.catalog());
        let mut registry = Registry::new(catalog);
        for entry in self.registrations {
            let mut options = RegisterOptions::new()
                .follow(entry.follow)
                .format(entry.format)
                .exclude(entry.exclude_fields);
            if let Some(fields) = entry.fields {
                options = options.fields(fields);
            }
            registry.register(entry.name, options)?;
        }
        Ok(registry)
    }
}
