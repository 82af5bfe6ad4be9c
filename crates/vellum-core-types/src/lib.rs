//! Vellum Core Types
//!
//! Correlation ids and the canonical structured-log vocabulary, shared by
//! the error and logging facilities of `vellum-core` and by the engine.

pub mod correlation;
pub mod schema;

pub use correlation::{RequestContext, RequestId, TraceId};
