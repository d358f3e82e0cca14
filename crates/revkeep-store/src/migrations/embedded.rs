//! SQL migrations compiled into the binary

/// One schema step; `id` is recorded in `schema_version`
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: "001_records",
        sql: include_str!("../../migrations/001_records.sql"),
    },
    Migration {
        id: "002_revision_history",
        sql: include_str!("../../migrations/002_revision_history.sql"),
    },
];

/// Every migration, oldest first
pub fn get_migrations() -> &'static [Migration] {
    MIGRATIONS
}
