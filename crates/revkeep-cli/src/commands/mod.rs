//! Subcommand implementations

pub mod log;
pub mod migrate;
pub mod revert;
pub mod show;

use std::path::Path;
use std::sync::Arc;

use revkeep_core::{Registry, SchemaConfig};
use revkeep_store::SqliteStore;

/// Paths shared by every subcommand
#[derive(Debug, Clone)]
pub struct Context {
    pub db: String,
    pub schema: String,
}

impl Context {
    /// Load the schema and open the store against its catalog
    pub fn open(&self) -> Result<(Arc<Registry>, SqliteStore), Box<dyn std::error::Error>> {
        let registry = Arc::new(SchemaConfig::from_path(Path::new(&self.schema))?.into_registry()?);
        ensure_parent_dir(&self.db)?;
        let store = SqliteStore::open(&self.db, registry.catalog_arc())?;
        Ok((registry, store))
    }
}

/// Create the directory holding the database file
pub fn ensure_parent_dir(db: &str) -> std::io::Result<()> {
    match Path::new(db).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
