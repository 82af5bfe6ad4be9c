//! Structured logging for the versioning engine
//!
//! - One initialization point: `init(profile)`
//! - Operation boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - An in-memory capture subscriber for test assertions
//!
//! ```rust
//! use vellum_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
pub use vellum_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

#[doc(hidden)]
pub use tracing as __tracing;
