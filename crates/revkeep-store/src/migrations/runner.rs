//! Migration runner
//!
//! Every embedded migration runs at most once, inside its own transaction,
//! and is recorded in `schema_version` with the SHA256 of its SQL. Before
//! anything is applied, the recorded checksums of earlier runs are compared
//! with the embedded SQL; an edited migration is refused.

use std::collections::HashMap;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection};

use crate::errors::{checksum_mismatch, from_rusqlite, migration_error, Result};
use crate::migrations::checksums::{checksum_matches, compute_checksum};
use crate::migrations::embedded::{get_migrations, Migration};

const CREATE_SCHEMA_VERSION: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY,
    migration_id TEXT NOT NULL UNIQUE,
    applied_at TEXT NOT NULL,
    checksum TEXT NOT NULL
)";

/// Bring the database up to the latest embedded migration
///
/// # Errors
///
/// - `Persistence` with op `migration_checksum` when an applied migration no
///   longer matches its embedded SQL
/// - `Persistence` with op `migration` when a migration's SQL fails; that
///   migration leaves no trace
pub fn apply_migrations(conn: &mut Connection) -> Result<()> {
    conn.execute(CREATE_SCHEMA_VERSION, []).map_err(from_rusqlite)?;

    let recorded = recorded_checksums(conn)?;
    let migrations = get_migrations();
    for migration in migrations {
        if let Some(expected) = recorded.get(migration.id) {
            if !checksum_matches(migration.sql, expected) {
                return Err(checksum_mismatch(
                    migration.id,
                    expected,
                    &compute_checksum(migration.sql),
                ));
            }
        }
    }

    let pending: Vec<&Migration> = migrations
        .iter()
        .filter(|m| !recorded.contains_key(m.id))
        .collect();
    for migration in &pending {
        apply_one(conn, migration)?;
    }

    tracing::debug!(applied_count = pending.len(), "migrations applied");
    Ok(())
}

/// Ids recorded in `schema_version`, in application order
///
/// # Errors
///
/// Returns `Persistence` if the table cannot be read.
pub fn applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT migration_id FROM schema_version ORDER BY id")
        .map_err(from_rusqlite)?;
    let ids = stmt
        .query_map([], |row| row.get(0))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(from_rusqlite)?;
    Ok(ids)
}

fn recorded_checksums(conn: &Connection) -> Result<HashMap<String, String>> {
    let mut stmt = conn
        .prepare("SELECT migration_id, checksum FROM schema_version")
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<HashMap<String, String>, _>>()
        .map_err(from_rusqlite)?;
    Ok(rows)
}

fn apply_one(conn: &mut Connection, migration: &Migration) -> Result<()> {
    let tx = conn.transaction().map_err(from_rusqlite)?;
    tx.execute_batch(migration.sql)
        .map_err(|e| migration_error(migration.id, &e.to_string()))?;
    tx.execute(
        "INSERT INTO schema_version (migration_id, applied_at, checksum) VALUES (?1, ?2, ?3)",
        params![
            migration.id,
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            compute_checksum(migration.sql)
        ],
    )
    .map_err(from_rusqlite)?;
    tx.commit().map_err(from_rusqlite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_gets_every_migration_in_order() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        assert_eq!(
            applied_migrations(&conn).unwrap(),
            vec!["001_records", "002_revision_history"]
        );
    }

    #[test]
    fn test_second_run_applies_nothing() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        apply_migrations(&mut conn).unwrap();
        assert_eq!(applied_migrations(&conn).unwrap().len(), 2);
    }

    #[test]
    fn test_edited_migration_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        conn.execute(
            "UPDATE schema_version SET checksum = 'deadbeef' WHERE migration_id = '001_records'",
            [],
        )
        .unwrap();

        let err = apply_migrations(&mut conn).unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_pending_migration_runs_after_earlier_ones() {
        // Simulate a database created before 002 existed
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute(CREATE_SCHEMA_VERSION, []).unwrap();
        let migrations = get_migrations();
        apply_one(&mut conn, &migrations[0]).unwrap();

        apply_migrations(&mut conn).unwrap();
        assert_eq!(applied_migrations(&conn).unwrap().len(), 2);
    }
}
