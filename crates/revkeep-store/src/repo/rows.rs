//! Row hydration - converts history rows back into core types

use chrono::{DateTime, SecondsFormat, Utc};
use revkeep_core::model::{Action, Revision, Version};
use revkeep_core_types::{ObjectKey, RevisionId, TypeName, VersionId};
use rusqlite::{Connection, Params, Row};

use crate::errors::{corrupt_row, from_rusqlite, Result};

pub(crate) const VERSION_COLUMNS: &str =
    "id, revision_id, object_key, type_name, format, serialized_data, object_repr, action";

pub(crate) const REVISION_COLUMNS: &str = "id, created_at, user_key, comment";

/// Revision timestamps are stored as RFC 3339 text with microseconds
pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| corrupt_row("revisions", e))
}

struct VersionRow {
    id: i64,
    revision_id: i64,
    object_key: i64,
    type_name: String,
    format: String,
    serialized_data: String,
    object_repr: String,
    action: i64,
}

impl VersionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            revision_id: row.get(1)?,
            object_key: row.get(2)?,
            type_name: row.get(3)?,
            format: row.get(4)?,
            serialized_data: row.get(5)?,
            object_repr: row.get(6)?,
            action: row.get(7)?,
        })
    }

    fn into_version(self) -> Result<Version> {
        let action = Action::from_flag(self.action)
            .ok_or_else(|| corrupt_row("versions", format!("unknown action {}", self.action)))?;
        Ok(Version {
            id: VersionId::new(self.id),
            revision_id: RevisionId::new(self.revision_id),
            object_key: ObjectKey::new(self.object_key),
            type_name: TypeName::new(self.type_name),
            format: self.format,
            serialized_data: self.serialized_data,
            object_repr: self.object_repr,
            action,
        })
    }
}

/// Run a query selecting [`VERSION_COLUMNS`]
pub(crate) fn query_versions<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Version>> {
    let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
    let rows = stmt
        .query_map(params, VersionRow::from_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    rows.into_iter().map(VersionRow::into_version).collect()
}

/// Run a query selecting [`REVISION_COLUMNS`]
pub(crate) fn query_revisions<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Revision>> {
    let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    rows.into_iter()
        .map(|(id, created_at, user_key, comment)| {
            Ok(Revision {
                id: RevisionId::new(id),
                created_at: parse_timestamp(&created_at)?,
                user: user_key.map(ObjectKey::new),
                comment,
            })
        })
        .collect()
}
