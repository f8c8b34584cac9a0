//! Operation logging macros
//!
//! Every operation logs a start event and exactly one of an end or an
//! end-error event, each tagged with `component`, `op` and `event`.

/// Log the start of an operation
///
/// ```
/// # use almanac_core::log_op_start;
/// log_op_start!("collect_unit");
/// log_op_start!("collect_unit", unit = "apo/60000");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::__schema::EVENT_START,
            $($($field)*)?
        )
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use almanac_core::log_op_end;
/// log_op_end!("merge_unit", duration_ms = 42, sections = 3);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::__schema::EVENT_END,
            duration_ms = $duration,
            $($($field)*)?
        )
    };
}

/// Log the failure of an operation; `$err` is anything convertible to `ExError`
///
/// ```
/// # use almanac_core::{log_op_error, errors::{ExError, ExErrorKind}};
/// let err = ExError::new(ExErrorKind::Collection).with_unit("apo/60000");
/// log_op_error!("collect_unit", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::__schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            error = %ex_err,
            $($($field)*)?
        )
    }};
}
