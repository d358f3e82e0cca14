use chrono::{DateTime, Utc};
use revkeep_core_types::{ObjectKey, ObjectRef, RevisionId, TypeName, VersionId};
use serde::{Deserialize, Serialize};

/// What happened to an object in a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Addition,
    Change,
    Deletion,
}

impl Action {
    /// Stored action flag (1, 2, 3)
    pub fn flag(self) -> i64 {
        match self {
            Action::Addition => 1,
            Action::Change => 2,
            Action::Deletion => 3,
        }
    }

    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            1 => Some(Action::Addition),
            2 => Some(Action::Change),
            3 => Some(Action::Deletion),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Addition => "Add",
            Action::Change => "Change",
            Action::Deletion => "Delete",
        }
    }
}

/// Extra metadata stored alongside a revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaRecord {
    pub kind: String,
    pub data: serde_json::Value,
}

impl MetaRecord {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

/// A committed group of versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    pub created_at: DateTime<Utc>,
    /// Key of the actor record that made the change
    pub user: Option<ObjectKey>,
    pub comment: String,
}

/// An immutable snapshot of one object within a revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub revision_id: RevisionId,
    pub object_key: ObjectKey,
    pub type_name: TypeName,
    /// Format tag of `serialized_data` (`json` or `yaml`)
    pub format: String,
    pub serialized_data: String,
    pub object_repr: String,
    pub action: Action,
}

impl Version {
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.type_name.clone(), self.object_key)
    }
}

/// A version that has not been persisted yet
#[derive(Debug, Clone, PartialEq)]
pub struct VersionDraft {
    pub object_key: ObjectKey,
    pub type_name: TypeName,
    pub format: String,
    pub serialized_data: String,
    pub object_repr: String,
    pub action: Action,
}

/// Everything one commit writes, persisted atomically
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionDraft {
    pub created_at: DateTime<Utc>,
    pub user: Option<ObjectKey>,
    pub comment: String,
    pub versions: Vec<VersionDraft>,
    pub meta: Vec<MetaRecord>,
}

/// Selects the revisions of a history window
///
/// The window holds the `limit` most recent revisions that contain a
/// matching version, optionally bounded above by `up_to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowQuery {
    /// Restrict to versions of these types with this key
    pub scope: Option<(Vec<TypeName>, ObjectKey)>,
    pub limit: usize,
    pub up_to: Option<RevisionId>,
}

impl Default for WindowQuery {
    fn default() -> Self {
        Self {
            scope: None,
            limit: 128,
            up_to: None,
        }
    }
}
