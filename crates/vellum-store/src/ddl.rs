//! DDL generated from the schema registry.
//!
//! Per entity type `<t>` with primary key `<pk>`:
//! - live table `<t>`: primary key plus every versioned column
//! - version table `<t>_version`: `<pk>`, `transaction_id`,
//!   `end_transaction_id`, `operation_type`, every versioned column and one
//!   `<column>_mod` flag per column
//! - unique `(<pk>, transaction_id)`, indexes on both transaction columns,
//!   and a partial unique index allowing one open row per entity
//!
//! Identifiers are validated by the registry before they get here.

use rusqlite::Connection;
use vellum_core::model::ColumnType;
use vellum_core::registry::{EntitySchema, SchemaRegistry};

use crate::errors::{from_rusqlite, Result};

fn key_type(schema: &EntitySchema) -> &'static str {
    match schema.primary_key_type() {
        ColumnType::Integer => "INTEGER",
        _ => "TEXT",
    }
}

fn live_table_sql(schema: &EntitySchema) -> String {
    let mut defs = vec![format!(
        "\"{}\" {} PRIMARY KEY NOT NULL",
        schema.primary_key(),
        key_type(schema)
    )];
    for col in schema.columns() {
        let not_null = if col.nullable { "" } else { " NOT NULL" };
        defs.push(format!("\"{}\" {}{}", col.name, col.ty.sql_type(), not_null));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n)",
        schema.table(),
        defs.join(",\n    ")
    )
}

fn version_table_sql(schema: &EntitySchema) -> String {
    let mut defs = vec![
        format!("\"{}\" {} NOT NULL", schema.primary_key(), key_type(schema)),
        "transaction_id INTEGER NOT NULL REFERENCES transactions(id)".to_string(),
        "end_transaction_id INTEGER REFERENCES transactions(id)".to_string(),
        "operation_type SMALLINT NOT NULL CHECK (operation_type IN (0, 1, 2))".to_string(),
    ];
    // Snapshot columns are nullable: a delete row may carry any last value
    for col in schema.columns() {
        defs.push(format!("\"{}\" {}", col.name, col.ty.sql_type()));
    }
    for col in schema.columns() {
        defs.push(format!(
            "\"{}\" BOOLEAN NOT NULL DEFAULT 0",
            col.flag_column()
        ));
    }
    defs.push("CHECK (end_transaction_id IS NULL OR end_transaction_id > transaction_id)".into());
    format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n)",
        schema.version_table(),
        defs.join(",\n    ")
    )
}

/// Statements creating the tables and indexes of one entity type
pub fn entity_ddl(schema: &EntitySchema) -> Vec<String> {
    let vt = schema.version_table();
    let pk = schema.primary_key();
    vec![
        live_table_sql(schema),
        version_table_sql(schema),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS \"ux_{vt}_{pk}_transaction_id\" ON \"{vt}\" (\"{pk}\", transaction_id)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS \"ix_{vt}_end_transaction_id\" ON \"{vt}\" (end_transaction_id)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS \"ix_{vt}_transaction_id\" ON \"{vt}\" (transaction_id)"
        ),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS \"ux_{vt}_{pk}_open\" ON \"{vt}\" (\"{pk}\") WHERE end_transaction_id IS NULL"
        ),
    ]
}

/// Create live and version tables for every registered entity type.
///
/// Runs in one transaction; existing tables are left untouched.
pub fn install_entity_tables(conn: &mut Connection, registry: &SchemaRegistry) -> Result<()> {
    let tx = conn.transaction().map_err(from_rusqlite)?;
    for schema in registry.schemas() {
        for statement in entity_ddl(schema) {
            tx.execute_batch(&statement).map_err(from_rusqlite)?;
        }
        tracing::debug!(entity_type = schema.name(), "Installed entity tables");
    }
    tx.commit().map_err(from_rusqlite)?;
    Ok(())
}
