//! Names of structured log fields and operation events
//!
//! The logging macros and the test capture layer read these, and log
//! consumers can match on them. Renaming one is a breaking change.

/// Emitting module path
pub const FIELD_COMPONENT: &str = "component";
/// Operation name, e.g. `commit_revision`
pub const FIELD_OP: &str = "op";
/// One of [`EVENT_START`], [`EVENT_END`], [`EVENT_END_ERROR`]
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

pub const FIELD_REVISION_ID: &str = "revision_id";
pub const FIELD_TYPE_NAME: &str = "type_name";
pub const FIELD_OBJECT_KEY: &str = "object_key";
/// Versions in a revision draft
pub const FIELD_VERSION_COUNT: &str = "version_count";
/// Objects reached by a relationship closure
pub const FIELD_CLOSURE_LEN: &str = "closure_len";

/// Debug rendering of the error kind
pub const FIELD_ERR_KIND: &str = "err_kind";
/// Stable `ERR_*` code
pub const FIELD_ERR_CODE: &str = "err_code";

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
