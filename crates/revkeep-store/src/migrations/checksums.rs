//! Checksum validation for migrations
//!
//! A migration's SHA256 is recorded when it is applied and compared on every
//! later run.

use sha2::{Digest, Sha256};

/// Hex SHA256 of migration SQL
pub fn compute_checksum(sql: &str) -> String {
    hex::encode(Sha256::digest(sql.as_bytes()))
}

/// Whether `sql` still hashes to the checksum recorded for it
pub fn checksum_matches(sql: &str, recorded: &str) -> bool {
    compute_checksum(sql) == recorded
}
