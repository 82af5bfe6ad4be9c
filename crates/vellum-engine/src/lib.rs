//! Vellum Engine - orchestration of the temporal versioning engine
//!
//! Ties the pure core to the SQLite store:
//! - transaction context (`begin_transaction`, `commit`, `abort`)
//! - version writer (`record_mutation`) and the entity mutation path
//! - history reader, revert engine and chain maintenance
//! - `EngineCommand` dispatch

pub mod commands;

pub use commands::context::{abort, begin_transaction, begin_transaction_with, commit, TransactionHandle};
pub use commands::engine_command::{apply_engine_command, EngineCommand, EngineCommandResult};
pub use commands::history::{
    show_changesets, show_changesets_with, transaction_changes, version_at, versions, EntityChange,
    TransactionChanges, VersionRecord,
};
pub use commands::maintenance::{rebuild_change_flags, verify_all, verify_chain, ChainReport, RebuildReport};
pub use commands::revert::{revert, revert_in};
pub use commands::writer::record_mutation;
