//! Command orchestration layer.
//!
//! Every public operation here logs one start event and one end or
//! end_error event through the logging facility macros.

pub mod context;
pub mod engine_command;
pub mod entity;
pub mod history;
pub mod maintenance;
pub mod revert;
pub mod writer;

use std::time::Instant;

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
