//! History Reader
//!
//! Read-only queries over version chains and the ledger. None of these
//! take a handle; they read committed state through any connection.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;
use vellum_core::diff::{build_changesets, ChangeDetection, Changeset};
use vellum_core::errors::{ExError, ExErrorKind, VersioningError};
use vellum_core::model::{EntityId, OperationKind, Transaction, TransactionId, VersionRow};
use vellum_core::registry::{EntitySchema, SchemaRegistry};
use vellum_core::timeline::covering_row;
use vellum_core::{log_op_end, log_op_error, log_op_start};
use vellum_store::errors::Result;
use vellum_store::{LedgerRepo, VersionRepo};

use crate::commands::elapsed_ms;

/// A version row with its ledger transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionRecord {
    pub transaction: Transaction,
    #[serde(flatten)]
    pub row: VersionRow,
}

/// One entity written by a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityChange {
    pub entity_type: String,
    pub entity_id: EntityId,
    pub operation: OperationKind,
}

/// Everything one transaction wrote, across entity types
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionChanges {
    pub transaction: Transaction,
    pub changes: Vec<EntityChange>,
}

fn load_chain(conn: &Connection, schema: &EntitySchema, id: &EntityId) -> Result<Vec<VersionRow>> {
    let rows = VersionRepo::chain(conn, schema, id)?;
    if rows.is_empty() {
        return Err(VersioningError::HistoryNotFound {
            entity_type: schema.name().to_string(),
            entity_id: id.to_string(),
        }
        .into());
    }
    Ok(rows)
}

/// Ordered changesets of one entity, diffing adjacent snapshots
pub fn show_changesets(
    conn: &Connection,
    registry: &SchemaRegistry,
    entity_type: &str,
    entity_id: &EntityId,
) -> Result<Vec<Changeset>> {
    show_changesets_with(conn, registry, entity_type, entity_id, ChangeDetection::default())
}

/// [`show_changesets`] with an explicit change detection policy
pub fn show_changesets_with(
    conn: &Connection,
    registry: &SchemaRegistry,
    entity_type: &str,
    entity_id: &EntityId,
    detection: ChangeDetection,
) -> Result<Vec<Changeset>> {
    let start = Instant::now();
    log_op_start!(
        "show_changesets",
        entity_type = entity_type,
        entity_id = %entity_id
    );

    let result = load_changesets(conn, registry, entity_type, entity_id, detection);

    match &result {
        Ok(changesets) => log_op_end!(
            "show_changesets",
            duration_ms = elapsed_ms(start),
            entity_type = entity_type,
            entity_id = %entity_id,
            changeset_count = changesets.len()
        ),
        Err(e) => log_op_error!(
            "show_changesets",
            e,
            duration_ms = elapsed_ms(start),
            entity_type = entity_type,
            entity_id = %entity_id
        ),
    }
    result
}

fn load_changesets(
    conn: &Connection,
    registry: &SchemaRegistry,
    entity_type: &str,
    entity_id: &EntityId,
    detection: ChangeDetection,
) -> Result<Vec<Changeset>> {
    let schema = registry.get(entity_type)?;
    let rows = load_chain(conn, schema, entity_id)?;
    let ids: BTreeSet<TransactionId> = rows.iter().map(|r| r.transaction_id).collect();
    let transactions = LedgerRepo::get_many(conn, &ids)?;
    Ok(build_changesets(
        schema.columns(),
        &rows,
        &transactions,
        detection,
    )?)
}

/// Raw version rows of one entity with their transactions, oldest first
pub fn versions(
    conn: &Connection,
    registry: &SchemaRegistry,
    entity_type: &str,
    entity_id: &EntityId,
) -> Result<Vec<VersionRecord>> {
    let schema = registry.get(entity_type)?;
    let rows = load_chain(conn, schema, entity_id)?;
    let ids: BTreeSet<TransactionId> = rows.iter().map(|r| r.transaction_id).collect();
    let transactions = LedgerRepo::get_many(conn, &ids)?;

    rows.into_iter()
        .map(|row| -> Result<VersionRecord> {
            let transaction = transactions.get(&row.transaction_id).cloned().ok_or(
                VersioningError::MissingTransaction {
                    transaction_id: row.transaction_id,
                },
            )?;
            Ok(VersionRecord { transaction, row })
        })
        .collect()
}

/// The version row that was current at `transaction_id`.
///
/// A transaction at which the entity was deleted, or before it existed, has
/// no state: `NoHistoricalState`.
pub fn version_at(
    conn: &Connection,
    registry: &SchemaRegistry,
    entity_type: &str,
    entity_id: &EntityId,
    transaction_id: TransactionId,
) -> Result<VersionRow> {
    let schema = registry.get(entity_type)?;
    let rows = load_chain(conn, schema, entity_id)?;
    covering_row(&rows, transaction_id)
        .filter(|row| !row.is_delete())
        .cloned()
        .ok_or_else(|| {
            VersioningError::NoHistoricalState {
                entity_type: entity_type.to_string(),
                entity_id: entity_id.to_string(),
                transaction_id,
            }
            .into()
        })
}

/// Every entity written by `transaction_id`, across all registered types
pub fn transaction_changes(
    conn: &Connection,
    registry: &SchemaRegistry,
    transaction_id: TransactionId,
) -> Result<TransactionChanges> {
    let transaction = LedgerRepo::get(conn, transaction_id)?.ok_or_else(|| {
        ExError::new(ExErrorKind::NotFound)
            .with_op("transaction_changes")
            .with_transaction_id(transaction_id)
            .with_message(format!("transaction {} is not in the ledger", transaction_id))
    })?;

    let mut changes = Vec::new();
    for schema in registry.schemas() {
        for (entity_id, operation) in VersionRepo::written_by(conn, schema, transaction_id)? {
            changes.push(EntityChange {
                entity_type: schema.name().to_string(),
                entity_id,
                operation,
            });
        }
    }
    Ok(TransactionChanges {
        transaction,
        changes,
    })
}
