use thiserror::Error;

/// Result type alias using RevkeepError
pub type Result<T> = std::result::Result<T, RevkeepError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// A stable, structured classification of every error the engine, the
/// SQLite backend and the CLI can surface. Each kind maps to a stable error
/// code usable for programmatic handling, log assertions and exit reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Scope
    NotInScope,

    // Registry / catalog
    NotRegistered,
    AlreadyRegistered,
    UnknownType,
    UnknownField,
    InvalidRelationship,

    // Validation
    MissingKey,
    UnknownFormat,
    EmptyRevision,

    // Lookup
    NotFound,

    // Commit
    /// A deleted object reached the commit without its frozen payload, or a
    /// live closure entry is still marked as deleted
    InvariantViolation,

    // Integration
    Serialization,
    Persistence,
    Migration,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::NotInScope => "ERR_NOT_IN_SCOPE",
            ExErrorKind::NotRegistered => "ERR_NOT_REGISTERED",
            ExErrorKind::AlreadyRegistered => "ERR_ALREADY_REGISTERED",
            ExErrorKind::UnknownType => "ERR_UNKNOWN_TYPE",
            ExErrorKind::UnknownField => "ERR_UNKNOWN_FIELD",
            ExErrorKind::InvalidRelationship => "ERR_INVALID_RELATIONSHIP",
            ExErrorKind::MissingKey => "ERR_MISSING_KEY",
            ExErrorKind::UnknownFormat => "ERR_UNKNOWN_FORMAT",
            ExErrorKind::EmptyRevision => "ERR_EMPTY_REVISION",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::InvariantViolation => "ERR_INVARIANT_VIOLATION",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Migration => "ERR_MIGRATION",
        }
    }
}

/// Canonical structured error type
///
/// Classification fields for programmatic handling plus context for
/// debugging. Every [`RevkeepError`] converts into one.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context (an object ref, revision id or type name)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for revision capture, diffing and persistence
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RevkeepError {
    // ===== Scope =====
    /// A tracker operation was called with no revision scope active
    #[error("There is no active revision for this context")]
    NotInScope,

    // ===== Registry =====
    #[error("Type {type_name} has not been registered for versioning")]
    NotRegistered { type_name: String },

    #[error("Type {type_name} has already been registered for versioning")]
    AlreadyRegistered { type_name: String },

    #[error("Unknown record type: {type_name}")]
    UnknownType { type_name: String },

    #[error("Type {type_name} has no field {field}")]
    UnknownField { type_name: String, field: String },

    /// A follow name or stored value does not describe a relationship
    #[error("Cannot follow relationship {relationship}, unexpected value: {found}")]
    InvalidRelationship { relationship: String, found: String },

    // ===== Commit =====
    #[error("Deletion invariant violated for {object}: {reason}")]
    DeletionInvariantViolation { object: String, reason: String },

    #[error("A revision must contain at least one version")]
    EmptyRevision,

    // ===== Validation =====
    #[error("Record of type {type_name} has no key; save it before tracking")]
    MissingKey { type_name: String },

    #[error("Unknown serialization format: {format}")]
    UnknownFormat { format: String },

    // ===== Lookup =====
    #[error("Revision not found: {revision_id}")]
    RevisionNotFound { revision_id: i64 },

    #[error("Version not found: {reason}")]
    VersionNotFound { reason: String },

    // ===== Integration =====
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Persistence error in {op}: {message}")]
    Persistence { op: String, message: String },
}

impl From<RevkeepError> for ExError {
    fn from(err: RevkeepError) -> Self {
        match err {
            RevkeepError::NotInScope => ExError::new(ExErrorKind::NotInScope)
                .with_message("There is no active revision for this context"),

            RevkeepError::NotRegistered { type_name } => ExError::new(ExErrorKind::NotRegistered)
                .with_entity_id(type_name)
                .with_message("Type has not been registered for versioning"),

            RevkeepError::AlreadyRegistered { type_name } => {
                ExError::new(ExErrorKind::AlreadyRegistered)
                    .with_entity_id(type_name)
                    .with_message("Type has already been registered for versioning")
            }

            RevkeepError::UnknownType { type_name } => ExError::new(ExErrorKind::UnknownType)
                .with_entity_id(type_name)
                .with_message("Unknown record type"),

            RevkeepError::UnknownField { type_name, field } => {
                ExError::new(ExErrorKind::UnknownField)
                    .with_entity_id(type_name)
                    .with_message(format!("No field {}", field))
            }

            RevkeepError::InvalidRelationship {
                relationship,
                found,
            } => ExError::new(ExErrorKind::InvalidRelationship)
                .with_entity_id(relationship)
                .with_message(format!("Cannot follow relationship, found: {}", found)),

            RevkeepError::DeletionInvariantViolation { object, reason } => {
                ExError::new(ExErrorKind::InvariantViolation)
                    .with_op("commit_revision")
                    .with_entity_id(object)
                    .with_message(reason)
            }

            RevkeepError::EmptyRevision => ExError::new(ExErrorKind::EmptyRevision)
                .with_message("A revision must contain at least one version"),

            RevkeepError::MissingKey { type_name } => ExError::new(ExErrorKind::MissingKey)
                .with_entity_id(type_name)
                .with_message("Record has no key"),

            RevkeepError::UnknownFormat { format } => ExError::new(ExErrorKind::UnknownFormat)
                .with_message(format!("Unknown serialization format: {}", format)),

            RevkeepError::RevisionNotFound { revision_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(revision_id.to_string())
                .with_message("Revision not found"),

            RevkeepError::VersionNotFound { reason } => {
                ExError::new(ExErrorKind::NotFound).with_message(reason)
            }

            RevkeepError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            RevkeepError::Persistence { op, message } => {
                let kind = if op.starts_with("migration") {
                    ExErrorKind::Migration
                } else {
                    ExErrorKind::Persistence
                };
                ExError::new(kind).with_op(op).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for RevkeepError {
    fn from(err: serde_json::Error) -> Self {
        RevkeepError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for RevkeepError {
    fn from(err: serde_yaml::Error) -> Self {
        RevkeepError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_stable_codes() {
        let cases = [
            (RevkeepError::NotInScope, "ERR_NOT_IN_SCOPE"),
            (
                RevkeepError::NotRegistered {
                    type_name: "Page".into(),
                },
                "ERR_NOT_REGISTERED",
            ),
            (
                RevkeepError::DeletionInvariantViolation {
                    object: "Page:1".into(),
                    reason: "no frozen payload".into(),
                },
                "ERR_INVARIANT_VIOLATION",
            ),
            (
                RevkeepError::RevisionNotFound { revision_id: 9 },
                "ERR_NOT_FOUND",
            ),
            (RevkeepError::EmptyRevision, "ERR_EMPTY_REVISION"),
        ];
        for (err, expected_code) in cases {
            let ex: ExError = err.clone().into();
            assert_eq!(ex.code(), expected_code, "Wrong code for {:?}", err);
        }
    }

    #[test]
    fn test_migration_persistence_errors_get_migration_kind() {
        let ex: ExError = RevkeepError::Persistence {
            op: "migration_apply".into(),
            message: "boom".into(),
        }
        .into();
        assert_eq!(ex.kind(), ExErrorKind::Migration);
        assert_eq!(ex.op(), Some("migration_apply"));
    }

    #[test]
    fn test_ex_error_display_includes_context() {
        let ex = ExError::new(ExErrorKind::NotFound)
            .with_op("revert_revision")
            .with_entity_id("12")
            .with_message("Revision not found");
        assert_eq!(
            ex.to_string(),
            "[ERR_NOT_FOUND] in operation 'revert_revision': Revision not found (entity_id: 12)"
        );
    }

    #[test]
    fn test_invalid_relationship_message() {
        let err = RevkeepError::InvalidRelationship {
            relationship: "Page.title".into(),
            found: "text".into(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot follow relationship Page.title, unexpected value: text"
        );
    }
}
