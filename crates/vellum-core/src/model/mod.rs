//! Versioning domain model
//!
//! - `ColumnType` / `ColumnValue`: typed column values
//! - `Columns`: one entity state, keyed by column name
//! - `Transaction`, `TransactionId`, `ActorId`, `EntityId`: ledger identities
//! - `VersionRow`, `OperationKind`: immutable snapshots on the transaction axis

pub mod columns;
pub mod transaction;
pub mod value;
pub mod version;

pub use columns::Columns;
pub use transaction::{ActorId, EntityId, Transaction, TransactionId};
pub use value::{ColumnType, ColumnValue};
pub use version::{OperationKind, VersionRow};
