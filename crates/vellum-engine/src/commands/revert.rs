//! Revert Engine
//!
//! Restores an entity to the snapshot that was current at a past
//! transaction by writing that snapshot as a new update. Existing version
//! rows are never touched beyond the usual close of the open row. Only the
//! entity's own columns are restored; dependents are not.

use rusqlite::Connection;
use std::time::Instant;
use vellum_core::errors::{ExError, ExErrorKind, VersioningError};
use vellum_core::model::{EntityId, Transaction, TransactionId, VersionRow};
use vellum_core::registry::SchemaRegistry;
use vellum_core::timeline::{covering_row, open_row};
use vellum_core::{log_op_end, log_op_error, log_op_start};
use vellum_store::errors::Result;
use vellum_store::{LiveRepo, VersionRepo};

use crate::commands::context::{abort, begin_transaction, commit, TransactionHandle};
use crate::commands::elapsed_ms;
use crate::commands::entity;

/// Revert in a fresh transaction attributed to `actor_id`.
///
/// Commits on success and aborts on any failure; returns the committed
/// transaction.
pub fn revert(
    conn: &mut Connection,
    registry: &SchemaRegistry,
    entity_type: &str,
    entity_id: &EntityId,
    target: TransactionId,
    actor_id: Option<&str>,
) -> Result<Transaction> {
    let start = Instant::now();
    log_op_start!(
        "revert",
        entity_type = entity_type,
        entity_id = %entity_id,
        target_transaction_id = target.get()
    );

    let result = run_revert(conn, registry, entity_type, entity_id, target, actor_id);

    match &result {
        Ok(tx) => log_op_end!(
            "revert",
            duration_ms = elapsed_ms(start),
            entity_type = entity_type,
            entity_id = %entity_id,
            transaction_id = tx.id.get()
        ),
        Err(e) => log_op_error!(
            "revert",
            e,
            duration_ms = elapsed_ms(start),
            entity_type = entity_type,
            entity_id = %entity_id
        ),
    }
    result
}

fn run_revert(
    conn: &mut Connection,
    registry: &SchemaRegistry,
    entity_type: &str,
    entity_id: &EntityId,
    target: TransactionId,
    actor_id: Option<&str>,
) -> Result<Transaction> {
    let handle = begin_transaction(conn, actor_id)?;
    match revert_in(registry, &handle, entity_type, entity_id, target) {
        Ok(_) => commit(handle),
        Err(e) => {
            abort(handle)?;
            Err(e)
        }
    }
}

/// Revert under a caller-owned handle and return the new version row
pub fn revert_in(
    registry: &SchemaRegistry,
    handle: &TransactionHandle<'_>,
    entity_type: &str,
    entity_id: &EntityId,
    target: TransactionId,
) -> Result<VersionRow> {
    let schema = registry.get(entity_type)?;
    let chain = VersionRepo::chain(handle.conn(), schema, entity_id)?;
    if chain.is_empty() {
        return Err(VersioningError::HistoryNotFound {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
        }
        .into());
    }

    let no_state = || -> ExError {
        VersioningError::NoHistoricalState {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            transaction_id: target,
        }
        .into()
    };
    if target >= handle.transaction_id() {
        return Err(no_state());
    }
    let snapshot = covering_row(&chain, target)
        .filter(|row| !row.is_delete())
        .ok_or_else(no_state)?;

    let rejected = |reason: &str| {
        ExError::new(ExErrorKind::RevertRejected)
            .with_op("revert")
            .with_entity_type(entity_type)
            .with_entity_id(entity_id.as_str())
            .with_transaction_id(target)
            .with_message(reason.to_string())
    };
    match open_row(&chain) {
        Some(row) if !row.is_delete() => {}
        _ => return Err(rejected("entity is deleted; there is no live row to restore into")),
    }
    if LiveRepo::get(handle.conn(), schema, entity_id)?.is_none() {
        return Err(rejected("entity has no live row to restore into"));
    }

    tracing::debug!(
        entity_type,
        entity_id = %entity_id,
        from_transaction_id = snapshot.transaction_id.get(),
        "Restoring snapshot"
    );
    entity::restore(registry, handle, entity_type, entity_id, &snapshot.columns)
}
