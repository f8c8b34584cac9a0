//! Logging for almanac binaries and tests
//!
//! [`init`] installs the process-wide `tracing` subscriber for a [`Profile`];
//! later calls are ignored. Operations report themselves through the
//! `log_op_start!`, `log_op_end!` and `log_op_error!` macros, and tests can
//! swap in [`init_test_capture`] to assert on what was logged.
//!
//! ```rust
//! use almanac_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, init_with_level, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
