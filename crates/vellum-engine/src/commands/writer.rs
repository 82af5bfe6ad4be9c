//! Version Writer
//!
//! For one entity mutation under an open handle:
//! 1. find the entity's open version row
//! 2. close it at the handle's transaction id
//! 3. snapshot `after` and compute the `_mod` flags against the closed row
//!    (an insert is compared against nothing)
//! 4. append the new open row
//!
//! All of it runs inside the handle's SQLite transaction. A failure poisons
//! the handle so the unit of work can only be rolled back.

use std::time::Instant;
use vellum_core::diff::changed_columns;
use vellum_core::errors::{ExError, ExErrorKind};
use vellum_core::model::{Columns, EntityId, OperationKind, VersionRow};
use vellum_core::registry::{EntitySchema, SchemaRegistry};
use vellum_core::{log_op_end, log_op_error, log_op_start};
use vellum_store::errors::Result;
use vellum_store::VersionRepo;

use crate::commands::context::TransactionHandle;
use crate::commands::elapsed_ms;

/// Record one mutation of `entity_id` under `handle`.
///
/// - `Insert`: `after` required; allowed when the entity has no history or
///   its current row is a delete (re-insert).
/// - `Update`: `after` required; the entity must currently exist.
/// - `Delete`: `after` must be `None`; the new row carries the last known
///   values.
///
/// When `before` is given it must equal the open row's snapshot, otherwise
/// another writer changed the entity and the result is `Conflict`.
pub fn record_mutation(
    registry: &SchemaRegistry,
    handle: &TransactionHandle<'_>,
    entity_type: &str,
    entity_id: &EntityId,
    operation: OperationKind,
    before: Option<&Columns>,
    after: Option<&Columns>,
) -> Result<VersionRow> {
    let start = Instant::now();
    log_op_start!(
        "record_mutation",
        entity_type = entity_type,
        entity_id = %entity_id,
        operation = operation.as_str(),
        transaction_id = handle.transaction_id().get(),
        request_id = %handle.request_context().request_id
    );

    let result = handle.guard(write_version(
        registry,
        handle,
        entity_type,
        entity_id,
        operation,
        before,
        after,
    ));

    match &result {
        Ok(row) => log_op_end!(
            "record_mutation",
            duration_ms = elapsed_ms(start),
            entity_type = entity_type,
            entity_id = %entity_id,
            transaction_id = row.transaction_id.get()
        ),
        Err(e) => log_op_error!(
            "record_mutation",
            e,
            duration_ms = elapsed_ms(start),
            entity_type = entity_type,
            entity_id = %entity_id
        ),
    }
    result
}

fn error(kind: ExErrorKind, schema: &EntitySchema, id: &EntityId, message: String) -> ExError {
    ExError::new(kind)
        .with_op("record_mutation")
        .with_entity_type(schema.name())
        .with_entity_id(id.as_str())
        .with_message(message)
}

fn write_version(
    registry: &SchemaRegistry,
    handle: &TransactionHandle<'_>,
    entity_type: &str,
    entity_id: &EntityId,
    operation: OperationKind,
    before: Option<&Columns>,
    after: Option<&Columns>,
) -> Result<VersionRow> {
    let schema = registry.get(entity_type)?;
    let conn = handle.conn();
    let transaction_id = handle.transaction_id();

    if let Some(after) = after {
        if after.contains(schema.primary_key()) && &schema.primary_key_of(after)? != entity_id {
            return Err(error(
                ExErrorKind::InvalidInput,
                schema,
                entity_id,
                format!("primary key in column map does not match {}", entity_id),
            ));
        }
    }

    let open = VersionRepo::open_row(conn, schema, entity_id)?;

    if let Some(open) = &open {
        if open.transaction_id == transaction_id {
            return Err(error(
                ExErrorKind::Conflict,
                schema,
                entity_id,
                format!("already written in transaction {}", transaction_id),
            )
            .with_transaction_id(transaction_id));
        }
        if let Some(before) = before {
            if schema.snapshot(before)? != open.columns {
                return Err(error(
                    ExErrorKind::Conflict,
                    schema,
                    entity_id,
                    format!(
                        "current version (transaction {}) differs from the expected state",
                        open.transaction_id
                    ),
                ));
            }
        }
    }

    let live = open.as_ref().filter(|row| !row.is_delete());
    let snapshot = match (operation, after) {
        (OperationKind::Insert, Some(after)) => {
            if live.is_some() {
                return Err(error(
                    ExErrorKind::AlreadyExists,
                    schema,
                    entity_id,
                    format!("{} {} already exists", entity_type, entity_id),
                ));
            }
            schema.snapshot(after)?
        }
        (OperationKind::Update, Some(after)) => {
            if live.is_none() {
                return Err(not_current(schema, entity_id, open.as_ref()));
            }
            schema.snapshot(after)?
        }
        (OperationKind::Delete, None) => match live {
            Some(row) => row.columns.clone(),
            None => return Err(not_current(schema, entity_id, open.as_ref())),
        },
        (OperationKind::Delete, Some(_)) => {
            return Err(error(
                ExErrorKind::InvalidInput,
                schema,
                entity_id,
                "a delete takes no after state".to_string(),
            ))
        }
        (_, None) => {
            return Err(error(
                ExErrorKind::InvalidInput,
                schema,
                entity_id,
                format!("{} requires an after state", operation),
            ))
        }
    };

    if let Some(open) = &open {
        VersionRepo::close(conn, schema, entity_id, open.transaction_id, transaction_id)?;
    }

    let changed = changed_columns(
        schema.columns(),
        operation,
        open.as_ref().map(|row| &row.columns),
        &snapshot,
    );
    let row = VersionRow {
        entity_id: entity_id.clone(),
        transaction_id,
        end_transaction_id: None,
        operation,
        columns: snapshot,
        changed,
    };
    VersionRepo::insert(conn, schema, &row)?;

    tracing::debug!(
        entity_type = schema.name(),
        entity_id = %entity_id,
        changed = row.changed.len(),
        "Appended version row"
    );
    Ok(row)
}

fn not_current(schema: &EntitySchema, id: &EntityId, open: Option<&VersionRow>) -> ExError {
    let message = match open {
        Some(_) => format!("{} {} was deleted; insert it again first", schema.name(), id),
        None => format!("{} {} has no version history", schema.name(), id),
    };
    error(ExErrorKind::NotFound, schema, id, message)
}
