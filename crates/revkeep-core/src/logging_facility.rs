//! Structured logging for revkeep operations
//!
//! - [`init`] installs the process subscriber for a [`Profile`]; call it once
//!   at startup (the CLI does).
//! - `log_op_start!`, `log_op_end!` and `log_op_error!` bracket the logged
//!   operations (`commit_revision`, `history_diff`, `revert_revision`) with
//!   the field names from [`crate::schema`].
//! - [`init_test_capture`] records events in memory so tests can assert on
//!   them.
//!
//! ```rust
//! use revkeep_core::logging_facility::{init, Profile};
//!
//! init(Profile::Production);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
