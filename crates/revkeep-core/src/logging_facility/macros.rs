//! Canonical logging macros
//!
//! Every operation boundary emits the same field set (`component`, `op`,
//! `event`, `duration_ms` and on failure `err_kind`/`err_code`) so that logs
//! from the engine, the SQLite backend and the CLI line up. Extra
//! `key = value` fields may follow the required ones.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_op_event {
    ($level:expr, $op:expr, $event:expr $(, $($field:tt)*)?) => {
        tracing::event!(
            $level,
            component = module_path!(),
            op = $op,
            event = $event,
            $($($field)*)?
        )
    };
}

/// Log the start of an operation
///
/// ```
/// # use revkeep_core::log_op_start;
/// log_op_start!("commit_revision");
/// log_op_start!("revert_revision", revision_id = 3, delete = false);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            tracing::Level::INFO,
            $op,
            $crate::schema::EVENT_START
            $(, $($field)*)?
        )
    };
}

/// Log the successful end of an operation; `duration_ms` is required
///
/// ```
/// # use revkeep_core::log_op_end;
/// log_op_end!("history_diff", duration_ms = 42, revision_count = 2);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            tracing::Level::INFO,
            $op,
            $crate::schema::EVENT_END,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Log a failed operation
///
/// `$err` is anything convertible into
/// [`ExError`](crate::errors::ExError); the event carries its kind and
/// stable code.
///
/// ```
/// # use revkeep_core::{log_op_error, errors::RevkeepError};
/// log_op_error!("commit_revision", RevkeepError::NotInScope, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__log_op_event!(
            tracing::Level::ERROR,
            $op,
            $crate::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code()
            $(, $($field)*)?
        );
    }};
}
