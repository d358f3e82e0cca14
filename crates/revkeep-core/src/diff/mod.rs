//! Version diff engine.
//!
//! Field-level deltas between committed versions, plus the batch form that
//! diffs a window of recent revisions at once and renders it as text.
//!
//! ## Entry points
//!
//! ```ignore
//! use revkeep_core::diff::{history_diff, render_history};
//!
//! let diff = history_diff(&registry, &store, None, 128, None)?;
//! println!("{}", render_history(&diff, registry.catalog(), &store)?);
//! ```
//!
//! ## Guarantees
//!
//! - **Determinism**: revisions are keyed by id and fields follow the
//!   registered whitelist order.
//! - **Datetime noise suppression**: two datetimes within the same whole
//!   second are never reported as a change.
//! - **Window approximation**: inside `history_diff` a change is compared to
//!   the adjacent version of the same object in the window; when that is not
//!   available it is reported as "Add or Change" against nothing.

pub mod engine;
pub mod human_summary;
pub mod model;

pub use engine::{diff_version, field_diff, history_diff};
pub use human_summary::render_history;
pub use model::{ChangeKind, DiffValue, FieldChange, HistoryDiff, RevisionDiff, VersionDiff};
