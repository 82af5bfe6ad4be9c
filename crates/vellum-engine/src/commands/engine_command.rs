//! Engine-level commands, each applied as its own unit of work.

use rusqlite::Connection;
use serde::Serialize;
use vellum_core::model::{Columns, EntityId, Transaction, TransactionId, VersionRow};
use vellum_core::registry::SchemaRegistry;
use vellum_store::errors::Result;

use crate::commands::context::{abort, begin_transaction, commit, TransactionHandle};
use crate::commands::{entity, revert};

/// A single mutation of one entity
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Create an entity; `columns` must hold the primary key.
    Create {
        entity_type: String,
        columns: Columns,
    },
    /// Merge `changes` over the live row.
    Update {
        entity_type: String,
        entity_id: EntityId,
        changes: Columns,
    },
    Delete {
        entity_type: String,
        entity_id: EntityId,
    },
    /// Restore the snapshot that was current at `target`.
    Revert {
        entity_type: String,
        entity_id: EntityId,
        target: TransactionId,
    },
}

/// Outcome of a committed engine command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineCommandResult {
    pub transaction: Transaction,
    pub entity_id: EntityId,
    pub row: VersionRow,
}

/// Apply `cmd` in a fresh transaction attributed to `actor_id`.
///
/// The transaction commits only if the command succeeds; on failure it is
/// aborted and nothing becomes visible.
pub fn apply_engine_command(
    cmd: EngineCommand,
    conn: &mut Connection,
    registry: &SchemaRegistry,
    actor_id: Option<&str>,
) -> Result<EngineCommandResult> {
    let handle = begin_transaction(conn, actor_id)?;
    match dispatch(&cmd, registry, &handle) {
        Ok(row) => {
            let transaction = commit(handle)?;
            Ok(EngineCommandResult {
                transaction,
                entity_id: row.entity_id.clone(),
                row,
            })
        }
        Err(e) => {
            abort(handle)?;
            Err(e)
        }
    }
}

fn dispatch(
    cmd: &EngineCommand,
    registry: &SchemaRegistry,
    handle: &TransactionHandle<'_>,
) -> Result<VersionRow> {
    match cmd {
        EngineCommand::Create {
            entity_type,
            columns,
        } => entity::create(registry, handle, entity_type, columns),
        EngineCommand::Update {
            entity_type,
            entity_id,
            changes,
        } => entity::update(registry, handle, entity_type, entity_id, changes),
        EngineCommand::Delete {
            entity_type,
            entity_id,
        } => entity::delete(registry, handle, entity_type, entity_id),
        EngineCommand::Revert {
            entity_type,
            entity_id,
            target,
        } => revert::revert_in(registry, handle, entity_type, entity_id, *target),
    }
}
