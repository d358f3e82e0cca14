//! Error helpers for revkeep-store
//!
//! The store speaks the core error type; these helpers build the
//! persistence-flavoured variants. Ops starting with `migration` surface as
//! `ERR_MIGRATION` once converted to the canonical `ExError`.

use revkeep_core::errors::RevkeepError;

/// Result type alias using the core error
pub type Result<T> = std::result::Result<T, RevkeepError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> RevkeepError {
    RevkeepError::Persistence {
        op: "migration".to_string(),
        message: format!("Migration {} failed: {}", migration_id, reason),
    }
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> RevkeepError {
    RevkeepError::Persistence {
        op: "migration_checksum".to_string(),
        message: format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ),
    }
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> RevkeepError {
    RevkeepError::Persistence {
        op: "sqlite".to_string(),
        message: err.to_string(),
    }
}

/// Create an error for a stored value that cannot be read back
pub fn corrupt_row(table: &str, reason: impl std::fmt::Display) -> RevkeepError {
    RevkeepError::Serialization {
        message: format!("Corrupt row in {}: {}", table, reason),
    }
}
