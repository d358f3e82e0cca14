//! Diff output types.
//!
//! All types implement `Debug, Clone, Serialize, Deserialize, PartialEq`.
//! Revisions are held in a `BTreeMap` for deterministic iteration.

use std::collections::BTreeMap;
use std::fmt;

use revkeep_core_types::RevisionId;
use serde::{Deserialize, Serialize};

use crate::model::{Action, FieldValue, Record, Revision, Version};

/// One side of a field change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DiffValue {
    /// Field absent from the snapshot (or no previous snapshot)
    Empty,
    Value(FieldValue),
    /// Representation string of the referenced object's version in the
    /// same revision
    Repr(String),
    /// Live actor record a reference points at
    Actor { record: Record, display: String },
}

impl DiffValue {
    pub fn is_empty(&self) -> bool {
        match self {
            DiffValue::Empty => true,
            DiffValue::Value(value) => value.is_empty(),
            DiffValue::Repr(repr) => repr.is_empty(),
            DiffValue::Actor { .. } => false,
        }
    }

    pub fn as_value(&self) -> Option<&FieldValue> {
        match self {
            DiffValue::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Option<FieldValue>> for DiffValue {
    fn from(value: Option<FieldValue>) -> Self {
        value.map(DiffValue::Value).unwrap_or(DiffValue::Empty)
    }
}

impl fmt::Display for DiffValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffValue::Empty => f.write_str("None"),
            DiffValue::Value(value) => write!(f, "{}", value),
            DiffValue::Repr(repr) => f.write_str(repr),
            DiffValue::Actor { display, .. } => f.write_str(display),
        }
    }
}

/// A reported field: (name, new value, old value)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub new: DiffValue,
    pub old: DiffValue,
}

/// How a version is presented in a history diff
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Change,
    Delete,
    /// A change whose predecessor is outside the window
    AddOrChange,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::Add => "Add",
            ChangeKind::Change => "Change",
            ChangeKind::Delete => "Delete",
            ChangeKind::AddOrChange => "Add or Change",
        }
    }
}

impl From<Action> for ChangeKind {
    fn from(action: Action) -> Self {
        match action {
            Action::Addition => ChangeKind::Add,
            Action::Change => ChangeKind::Change,
            Action::Deletion => ChangeKind::Delete,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionDiff {
    pub version: Version,
    pub kind: ChangeKind,
    pub fields: Vec<FieldChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevisionDiff {
    pub revision: Revision,
    /// Versions with at least one reported field
    pub changes: Vec<VersionDiff>,
}

/// Diff of a window of revisions, keyed by revision id
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistoryDiff {
    pub revisions: BTreeMap<RevisionId, RevisionDiff>,
}

impl HistoryDiff {
    pub fn get(&self, id: RevisionId) -> Option<&RevisionDiff> {
        self.revisions.get(&id)
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}
