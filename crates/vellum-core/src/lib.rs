//! Vellum Core - pure domain of the temporal versioning engine
//!
//! - Typed column values and entity snapshots (`model`)
//! - Static per-entity-type schema descriptors (`registry`)
//! - Changeset derivation between adjacent version rows (`diff`)
//! - Interval lookup and chain invariant checks on the transaction axis (`timeline`)
//! - Structured error and logging facilities, TOML configuration
//!
//! Nothing in this crate touches storage; `vellum-store` persists these
//! types and `vellum-engine` orchestrates them.

pub mod config;
pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod registry;
pub mod timeline;

pub use config::VellumConfig;
pub use diff::{ChangeDetection, Changeset, ColumnChange};
pub use errors::{ExError, ExErrorKind, Result, VersioningError};
pub use model::{
    ActorId, ColumnType, ColumnValue, Columns, EntityId, OperationKind, Transaction,
    TransactionId, VersionRow,
};
pub use registry::{ColumnDescriptor, EntitySchema, SchemaRegistry};
