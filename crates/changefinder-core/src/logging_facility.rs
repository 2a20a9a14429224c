//! Structured logging for the attribution pipeline
//!
//! - `init(profile)` installs the process-wide subscriber once
//! - `log_op_start!`, `log_op_end!` and `log_op_error!` emit the
//!   `start` / `end` / `end_error` events every operation logs
//! - `test_capture` records events in memory for assertions
//!
//! Beyond those, the pipeline emits `rule_fired` (debug), `fallback` (info)
//! and `anomaly` (warn) events keyed by `entity_id`.
//!
//! ```rust
//! use changefinder_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use changefinder_core_types::schema;
pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
