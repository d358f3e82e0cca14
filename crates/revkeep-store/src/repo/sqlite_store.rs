//! SQLite implementation of the core storage traits
//!
//! Live records are stored as JSON field maps keyed by (storage type, key);
//! shadow types therefore read and write their base type's row. A revision
//! and all its versions and metadata are written in one transaction.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use revkeep_core::errors::RevkeepError;
use revkeep_core::model::{
    Catalog, FieldValue, MetaRecord, Record, Revision, RevisionDraft, Version, WindowQuery,
};
use revkeep_core::store::{RecordStore, VersionStore};
use revkeep_core_types::{ObjectKey, RevisionId, TypeName, VersionId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::db;
use crate::errors::{corrupt_row, from_rusqlite, Result};
use crate::migrations::apply_migrations;
use crate::repo::rows::{
    format_timestamp, query_revisions, query_versions, REVISION_COLUMNS, VERSION_COLUMNS,
};

type FieldMap = BTreeMap<String, FieldValue>;

/// Record and version store backed by one SQLite connection
pub struct SqliteStore {
    conn: Connection,
    catalog: Arc<Catalog>,
}

impl SqliteStore {
    /// Open (creating if needed) a database file and apply pending migrations
    pub fn open<P: AsRef<Path>>(path: P, catalog: Arc<Catalog>) -> Result<Self> {
        Self::from_connection(db::open(path)?, catalog)
    }

    /// Open a migrated in-memory database
    pub fn open_in_memory(catalog: Arc<Catalog>) -> Result<Self> {
        Self::from_connection(db::open_in_memory()?, catalog)
    }

    /// Configure and migrate an existing connection
    pub fn from_connection(mut conn: Connection, catalog: Arc<Catalog>) -> Result<Self> {
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self { conn, catalog })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn storage_type(&self, type_name: &TypeName) -> String {
        self.catalog.storage_type(type_name).as_str().to_string()
    }
}

fn parse_fields(json: &str) -> Result<FieldMap> {
    serde_json::from_str(json).map_err(|e| corrupt_row("records", e))
}

impl RecordStore for SqliteStore {
    fn get(&self, type_name: &TypeName, key: ObjectKey) -> Result<Option<Record>> {
        let fields: Option<String> = self
            .conn
            .query_row(
                "SELECT fields FROM records WHERE type_name = ?1 AND object_key = ?2",
                params![self.storage_type(type_name), key.get()],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;

        fields
            .map(|json| -> Result<Record> {
                Ok(Record {
                    type_name: type_name.clone(),
                    key: Some(key),
                    fields: parse_fields(&json)?,
                })
            })
            .transpose()
    }

    fn save(&mut self, record: &mut Record) -> Result<()> {
        let storage = self.storage_type(&record.type_name);
        let fields = serde_json::to_string(&record.fields)?;

        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        let key = match record.key {
            Some(key) => {
                tx.execute(
                    "UPDATE key_sequence SET next_key = MAX(next_key, ?1 + 1) WHERE id = 1",
                    [key.get()],
                )
                .map_err(from_rusqlite)?;
                key
            }
            None => {
                let next: i64 = tx
                    .query_row("SELECT next_key FROM key_sequence WHERE id = 1", [], |row| {
                        row.get(0)
                    })
                    .map_err(from_rusqlite)?;
                tx.execute(
                    "UPDATE key_sequence SET next_key = ?1 WHERE id = 1",
                    [next + 1],
                )
                .map_err(from_rusqlite)?;
                ObjectKey::new(next)
            }
        };
        tx.execute(
            "INSERT INTO records (type_name, object_key, fields) VALUES (?1, ?2, ?3)
             ON CONFLICT(type_name, object_key) DO UPDATE SET fields = excluded.fields",
            params![storage, key.get(), fields],
        )
        .map_err(from_rusqlite)?;
        tx.commit().map_err(from_rusqlite)?;

        record.key = Some(key);
        Ok(())
    }

    fn remove(&mut self, type_name: &TypeName, key: ObjectKey) -> Result<bool> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM records WHERE type_name = ?1 AND object_key = ?2",
                params![self.storage_type(type_name), key.get()],
            )
            .map_err(from_rusqlite)?;
        Ok(removed > 0)
    }

    fn referencing(&self, source: &TypeName, field: &str, key: ObjectKey) -> Result<Vec<Record>> {
        let mut stmt = self
            .conn
            .prepare("SELECT object_key, fields FROM records WHERE type_name = ?1 ORDER BY object_key")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([self.storage_type(source)], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        let mut out = Vec::new();
        for (object_key, json) in rows {
            let fields = parse_fields(&json)?;
            let points_here = match fields.get(field) {
                Some(FieldValue::Ref(target)) => *target == key,
                Some(FieldValue::RefSet(targets)) => targets.contains(&key),
                _ => false,
            };
            if points_here {
                out.push(Record {
                    type_name: source.clone(),
                    key: Some(ObjectKey::new(object_key)),
                    fields,
                });
            }
        }
        Ok(out)
    }
}

impl VersionStore for SqliteStore {
    fn commit_revision(&mut self, draft: RevisionDraft) -> Result<Revision> {
        if draft.versions.is_empty() {
            return Err(RevkeepError::EmptyRevision);
        }

        let meta = draft
            .meta
            .iter()
            .map(|m| -> Result<(String, String)> {
                Ok((m.kind.clone(), serde_json::to_string(&m.data)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        tx.execute(
            "INSERT INTO revisions (created_at, user_key, comment) VALUES (?1, ?2, ?3)",
            params![
                format_timestamp(&draft.created_at),
                draft.user.map(|u| u.get()),
                draft.comment
            ],
        )
        .map_err(from_rusqlite)?;
        let revision_id = tx.last_insert_rowid();

        for version in &draft.versions {
            tx.execute(
                "INSERT INTO versions
                    (revision_id, object_key, type_name, format, serialized_data, object_repr, action)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    revision_id,
                    version.object_key.get(),
                    version.type_name.as_str(),
                    version.format,
                    version.serialized_data,
                    version.object_repr,
                    version.action.flag()
                ],
            )
            .map_err(from_rusqlite)?;
        }
        for (kind, data) in &meta {
            tx.execute(
                "INSERT INTO revision_meta (revision_id, kind, data) VALUES (?1, ?2, ?3)",
                params![revision_id, kind, data],
            )
            .map_err(from_rusqlite)?;
        }
        tx.commit().map_err(from_rusqlite)?;

        tracing::debug!(
            revision_id = revision_id,
            version_count = draft.versions.len(),
            "revision persisted"
        );

        Ok(Revision {
            id: RevisionId::new(revision_id),
            created_at: draft.created_at,
            user: draft.user,
            comment: draft.comment,
        })
    }

    fn revision(&self, id: RevisionId) -> Result<Option<Revision>> {
        let sql = format!("SELECT {} FROM revisions WHERE id = ?1", REVISION_COLUMNS);
        Ok(query_revisions(&self.conn, &sql, [id.get()])?.pop())
    }

    fn revision_versions(&self, id: RevisionId) -> Result<Vec<Version>> {
        let sql = format!(
            "SELECT {} FROM versions WHERE revision_id = ?1 ORDER BY id",
            VERSION_COLUMNS
        );
        query_versions(&self.conn, &sql, [id.get()])
    }

    fn revision_meta(&self, id: RevisionId) -> Result<Vec<MetaRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, data FROM revision_meta WHERE revision_id = ?1 ORDER BY id")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([id.get()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        rows.into_iter()
            .map(|(kind, data)| -> Result<MetaRecord> {
                let data: serde_json::Value =
                    serde_json::from_str(&data).map_err(|e| corrupt_row("revision_meta", e))?;
                Ok(MetaRecord::new(kind, data))
            })
            .collect()
    }

    fn version(&self, id: VersionId) -> Result<Option<Version>> {
        let sql = format!("SELECT {} FROM versions WHERE id = ?1", VERSION_COLUMNS);
        Ok(query_versions(&self.conn, &sql, [id.get()])?.pop())
    }

    fn object_versions(&self, type_name: &TypeName, key: ObjectKey) -> Result<Vec<Version>> {
        let sql = format!(
            "SELECT {} FROM versions WHERE type_name = ?1 AND object_key = ?2 ORDER BY id",
            VERSION_COLUMNS
        );
        query_versions(&self.conn, &sql, params![type_name.as_str(), key.get()])
    }

    fn history_window(&self, query: &WindowQuery) -> Result<Vec<Version>> {
        let mut conditions = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some((types, key)) = &query.scope {
            let placeholders = vec!["?"; types.len()].join(", ");
            conditions.push(format!("type_name IN ({}) AND object_key = ?", placeholders));
            values.extend(types.iter().map(|t| Value::Text(t.as_str().to_string())));
            values.push(Value::Integer(key.get()));
        }
        if let Some(up_to) = query.up_to {
            conditions.push("revision_id <= ?".to_string());
            values.push(Value::Integer(up_to.get()));
        }
        values.push(Value::Integer(i64::try_from(query.limit).unwrap_or(i64::MAX)));

        let filter = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "SELECT {columns} FROM versions
             WHERE revision_id IN (
                 SELECT DISTINCT revision_id FROM versions {filter}
                 ORDER BY revision_id DESC LIMIT ?
             )
             ORDER BY object_key ASC, type_name ASC, id DESC",
            columns = VERSION_COLUMNS,
            filter = filter,
        );
        query_versions(&self.conn, &sql, params_from_iter(values))
    }

    fn object_keys_for_type(&self, type_name: &TypeName) -> Result<Vec<ObjectKey>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT object_key FROM versions WHERE type_name = ?1 ORDER BY object_key")
            .map_err(from_rusqlite)?;
        let keys = stmt
            .query_map([type_name.as_str()], |row| row.get::<_, i64>(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(keys.into_iter().map(ObjectKey::new).collect())
    }

    fn delete_revision(&mut self, id: RevisionId) -> Result<bool> {
        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        tx.execute("DELETE FROM revision_meta WHERE revision_id = ?1", [id.get()])
            .map_err(from_rusqlite)?;
        tx.execute("DELETE FROM versions WHERE revision_id = ?1", [id.get()])
            .map_err(from_rusqlite)?;
        let removed = tx
            .execute("DELETE FROM revisions WHERE id = ?1", [id.get()])
            .map_err(from_rusqlite)?;
        tx.commit().map_err(from_rusqlite)?;
        Ok(removed > 0)
    }
}
