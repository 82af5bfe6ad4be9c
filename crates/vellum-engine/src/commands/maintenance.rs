//! Chain maintenance: invariant checks and `_mod` flag rebuilds.
//!
//! Neither operation allocates a ledger transaction. `verify_chain` only
//! reads; `rebuild_change_flags` rewrites cached flags in place and never
//! touches snapshot values or interval bounds.

use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;
use vellum_core::diff::changed_columns;
use vellum_core::model::{EntityId, TransactionId, VersionRow};
use vellum_core::registry::{ColumnDescriptor, SchemaRegistry};
use vellum_core::timeline::{check_chain, check_live, open_row, ChainViolation};
use vellum_core::{log_op_end, log_op_error, log_op_start};
use vellum_store::errors::{from_rusqlite, Result};
use vellum_store::{LiveRepo, VersionRepo};

use crate::commands::elapsed_ms;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub entity_type: String,
    pub entity_id: EntityId,
    pub version_count: usize,
    pub violations: Vec<ChainViolation>,
}

impl ChainReport {
    pub fn is_healthy(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub entity_type: String,
    pub entities: usize,
    pub rows_rewritten: usize,
}

/// Check one entity's chain and its live row
pub fn verify_chain(
    conn: &Connection,
    registry: &SchemaRegistry,
    entity_type: &str,
    entity_id: &EntityId,
) -> Result<ChainReport> {
    let start = Instant::now();
    log_op_start!("verify_chain", entity_type = entity_type, entity_id = %entity_id);

    let result = check_entity(conn, registry, entity_type, entity_id);

    match &result {
        Ok(report) => log_op_end!(
            "verify_chain",
            duration_ms = elapsed_ms(start),
            entity_type = entity_type,
            entity_id = %entity_id,
            violation_count = report.violations.len()
        ),
        Err(e) => log_op_error!("verify_chain", e, duration_ms = elapsed_ms(start)),
    }
    result
}

/// Check every versioned entity of one type; only unhealthy chains are returned
pub fn verify_all(
    conn: &Connection,
    registry: &SchemaRegistry,
    entity_type: &str,
) -> Result<Vec<ChainReport>> {
    let start = Instant::now();
    log_op_start!("verify_all", entity_type = entity_type);

    let result = check_all(conn, registry, entity_type);

    match &result {
        Ok(reports) => log_op_end!(
            "verify_all",
            duration_ms = elapsed_ms(start),
            entity_type = entity_type,
            unhealthy_count = reports.len()
        ),
        Err(e) => log_op_error!("verify_all", e, duration_ms = elapsed_ms(start)),
    }
    result
}

fn check_all(
    conn: &Connection,
    registry: &SchemaRegistry,
    entity_type: &str,
) -> Result<Vec<ChainReport>> {
    let schema = registry.get(entity_type)?;
    let mut unhealthy = Vec::new();
    for id in VersionRepo::entity_ids(conn, schema)? {
        let report = check_entity(conn, registry, entity_type, &id)?;
        if !report.is_healthy() {
            unhealthy.push(report);
        }
    }
    Ok(unhealthy)
}

fn check_entity(
    conn: &Connection,
    registry: &SchemaRegistry,
    entity_type: &str,
    entity_id: &EntityId,
) -> Result<ChainReport> {
    let schema = registry.get(entity_type)?;
    let rows = VersionRepo::chain(conn, schema, entity_id)?;
    let live = LiveRepo::get(conn, schema, entity_id)?;

    let mut violations = check_chain(schema.columns(), &rows);
    if !rows.is_empty() || live.is_some() {
        violations.extend(check_live(schema.columns(), open_row(&rows), live.as_ref()));
    }

    Ok(ChainReport {
        entity_type: entity_type.to_string(),
        entity_id: entity_id.clone(),
        version_count: rows.len(),
        violations,
    })
}

/// Recompute every `_mod` flag of one entity type from adjacent snapshots.
///
/// Runs in a single write transaction; rows whose flags already agree are
/// left alone.
pub fn rebuild_change_flags(
    conn: &mut Connection,
    registry: &SchemaRegistry,
    entity_type: &str,
) -> Result<RebuildReport> {
    let start = Instant::now();
    log_op_start!("rebuild_change_flags", entity_type = entity_type);

    let result = rebuild(conn, registry, entity_type);

    match &result {
        Ok(report) => log_op_end!(
            "rebuild_change_flags",
            duration_ms = elapsed_ms(start),
            entity_type = entity_type,
            entities = report.entities,
            rows_rewritten = report.rows_rewritten
        ),
        Err(e) => log_op_error!("rebuild_change_flags", e, duration_ms = elapsed_ms(start)),
    }
    result
}

fn rebuild(
    conn: &mut Connection,
    registry: &SchemaRegistry,
    entity_type: &str,
) -> Result<RebuildReport> {
    let schema = registry.get(entity_type)?;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| from_rusqlite(e).with_op("rebuild_change_flags"))?;

    let ids = VersionRepo::entity_ids(&tx, schema)?;
    let mut rows_rewritten = 0;
    for id in &ids {
        let rows = VersionRepo::chain(&tx, schema, id)?;
        for (row_id, expected) in recomputed_flags(schema.columns(), &rows) {
            VersionRepo::set_flags(&tx, schema, id, row_id, &expected)?;
            rows_rewritten += 1;
        }
    }

    tx.commit()
        .map_err(|e| from_rusqlite(e).with_op("rebuild_change_flags"))?;
    Ok(RebuildReport {
        entity_type: entity_type.to_string(),
        entities: ids.len(),
        rows_rewritten,
    })
}

/// Rows whose stored flags differ from the recomputed ones
fn recomputed_flags(
    columns: &[ColumnDescriptor],
    rows: &[VersionRow],
) -> Vec<(TransactionId, BTreeSet<String>)> {
    let mut stale = Vec::new();
    let mut previous: Option<&VersionRow> = None;
    for row in rows {
        let expected = changed_columns(
            columns,
            row.operation,
            previous.map(|p| &p.columns),
            &row.columns,
        );
        if expected != row.changed {
            stale.push((row.transaction_id, expected));
        }
        previous = Some(row);
    }
    stale
}
