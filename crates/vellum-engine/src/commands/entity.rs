//! Entity mutation path
//!
//! Writes the live table and records the matching version row under the
//! same handle. Audited entity types get their audit columns stamped from
//! the handle: all four on create, `date_updated`/`updated_by` on update.
//! An update never changes `date_created`/`created_by`; a restore writes a
//! historical snapshot back exactly, audit columns included.

use std::time::Instant;
use vellum_core::errors::{ExError, ExErrorKind};
use vellum_core::model::{ColumnValue, Columns, EntityId, OperationKind, VersionRow};
use vellum_core::registry::{
    EntitySchema, SchemaRegistry, AUDIT_CREATED_BY, AUDIT_DATE_CREATED, AUDIT_DATE_UPDATED,
    AUDIT_UPDATED_BY,
};
use vellum_core::{log_op_end, log_op_error, log_op_start};
use vellum_store::errors::Result;
use vellum_store::LiveRepo;

use crate::commands::context::TransactionHandle;
use crate::commands::elapsed_ms;
use crate::commands::writer::record_mutation;

fn actor_value(handle: &TransactionHandle<'_>) -> ColumnValue {
    handle
        .actor_id()
        .map_or(ColumnValue::Null, |a| ColumnValue::Text(a.as_str().to_string()))
}

fn stamp_created(schema: &EntitySchema, handle: &TransactionHandle<'_>, columns: &mut Columns) {
    if schema.is_audited() {
        columns.set(AUDIT_DATE_CREATED, handle.issued_at());
        columns.set(AUDIT_CREATED_BY, actor_value(handle));
        stamp_updated(schema, handle, columns);
    }
}

fn stamp_updated(schema: &EntitySchema, handle: &TransactionHandle<'_>, columns: &mut Columns) {
    if schema.is_audited() {
        columns.set(AUDIT_DATE_UPDATED, handle.issued_at());
        columns.set(AUDIT_UPDATED_BY, actor_value(handle));
    }
}

/// Creation stamps come from the live row, whatever the caller sent
fn keep_created(schema: &EntitySchema, live: &Columns, columns: &mut Columns) {
    if schema.is_audited() {
        for name in [AUDIT_DATE_CREATED, AUDIT_CREATED_BY] {
            columns.set(name, live.get(name).clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Audit {
    Stamp,
    Preserve,
}

fn missing(schema: &EntitySchema, id: &EntityId, op: &str) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_op(op)
        .with_entity_type(schema.name())
        .with_entity_id(id.as_str())
        .with_message(format!("{} {} does not exist", schema.name(), id))
}

/// Create an entity from `input`, which must hold the primary key
pub fn create(
    registry: &SchemaRegistry,
    handle: &TransactionHandle<'_>,
    entity_type: &str,
    input: &Columns,
) -> Result<VersionRow> {
    let start = Instant::now();
    log_op_start!(
        "create_entity",
        entity_type = entity_type,
        transaction_id = handle.transaction_id().get()
    );

    let result = handle.guard(create_entity(registry, handle, entity_type, input));

    match &result {
        Ok(row) => log_op_end!(
            "create_entity",
            duration_ms = elapsed_ms(start),
            entity_type = entity_type,
            entity_id = %row.entity_id
        ),
        Err(e) => log_op_error!("create_entity", e, duration_ms = elapsed_ms(start), entity_type = entity_type),
    }
    result
}

/// Merge `changes` over the live row and record the update
pub fn update(
    registry: &SchemaRegistry,
    handle: &TransactionHandle<'_>,
    entity_type: &str,
    entity_id: &EntityId,
    changes: &Columns,
) -> Result<VersionRow> {
    let start = Instant::now();
    log_op_start!(
        "update_entity",
        entity_type = entity_type,
        entity_id = %entity_id,
        transaction_id = handle.transaction_id().get()
    );

    let result = handle.guard(update_entity(
        registry,
        handle,
        entity_type,
        entity_id,
        changes,
        Audit::Stamp,
    ));

    match &result {
        Ok(_) => log_op_end!(
            "update_entity",
            duration_ms = elapsed_ms(start),
            entity_type = entity_type,
            entity_id = %entity_id
        ),
        Err(e) => log_op_error!(
            "update_entity",
            e,
            duration_ms = elapsed_ms(start),
            entity_type = entity_type,
            entity_id = %entity_id
        ),
    }
    result
}

/// Write `snapshot` back as the entity's current state, unstamped.
///
/// Used by revert: the new row's values equal the historical snapshot,
/// audit columns included.
pub fn restore(
    registry: &SchemaRegistry,
    handle: &TransactionHandle<'_>,
    entity_type: &str,
    entity_id: &EntityId,
    snapshot: &Columns,
) -> Result<VersionRow> {
    handle.guard(update_entity(
        registry,
        handle,
        entity_type,
        entity_id,
        snapshot,
        Audit::Preserve,
    ))
}

/// Remove the live row and record the terminal delete version
pub fn delete(
    registry: &SchemaRegistry,
    handle: &TransactionHandle<'_>,
    entity_type: &str,
    entity_id: &EntityId,
) -> Result<VersionRow> {
    let start = Instant::now();
    log_op_start!(
        "delete_entity",
        entity_type = entity_type,
        entity_id = %entity_id,
        transaction_id = handle.transaction_id().get()
    );

    let result = handle.guard(delete_entity(registry, handle, entity_type, entity_id));

    match &result {
        Ok(_) => log_op_end!(
            "delete_entity",
            duration_ms = elapsed_ms(start),
            entity_type = entity_type,
            entity_id = %entity_id
        ),
        Err(e) => log_op_error!(
            "delete_entity",
            e,
            duration_ms = elapsed_ms(start),
            entity_type = entity_type,
            entity_id = %entity_id
        ),
    }
    result
}

fn create_entity(
    registry: &SchemaRegistry,
    handle: &TransactionHandle<'_>,
    entity_type: &str,
    input: &Columns,
) -> Result<VersionRow> {
    let schema = registry.get(entity_type)?;
    let id = schema.primary_key_of(input)?;
    let mut after = schema.snapshot(input)?;
    stamp_created(schema, handle, &mut after);

    LiveRepo::insert(handle.conn(), schema, &id, &after)?;
    record_mutation(
        registry,
        handle,
        entity_type,
        &id,
        OperationKind::Insert,
        None,
        Some(&after),
    )
}

fn update_entity(
    registry: &SchemaRegistry,
    handle: &TransactionHandle<'_>,
    entity_type: &str,
    entity_id: &EntityId,
    changes: &Columns,
    audit: Audit,
) -> Result<VersionRow> {
    let schema = registry.get(entity_type)?;
    if changes.contains(schema.primary_key()) && &schema.primary_key_of(changes)? != entity_id {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("update_entity")
            .with_entity_type(schema.name())
            .with_entity_id(entity_id.as_str())
            .with_message("the primary key cannot be changed"));
    }
    let live = LiveRepo::get(handle.conn(), schema, entity_id)?
        .ok_or_else(|| missing(schema, entity_id, "update_entity"))?;

    let mut merged = live.merged_with(changes);
    if audit == Audit::Stamp {
        keep_created(schema, &live, &mut merged);
        stamp_updated(schema, handle, &mut merged);
    }
    let after = schema.snapshot(&merged)?;

    LiveRepo::update(handle.conn(), schema, entity_id, &after)?;
    record_mutation(
        registry,
        handle,
        entity_type,
        entity_id,
        OperationKind::Update,
        Some(&live),
        Some(&after),
    )
}

fn delete_entity(
    registry: &SchemaRegistry,
    handle: &TransactionHandle<'_>,
    entity_type: &str,
    entity_id: &EntityId,
) -> Result<VersionRow> {
    let schema = registry.get(entity_type)?;
    let live = LiveRepo::get(handle.conn(), schema, entity_id)?
        .ok_or_else(|| missing(schema, entity_id, "delete_entity"))?;

    LiveRepo::delete(handle.conn(), schema, entity_id)?;
    record_mutation(
        registry,
        handle,
        entity_type,
        entity_id,
        OperationKind::Delete,
        Some(&live),
        None,
    )
}
