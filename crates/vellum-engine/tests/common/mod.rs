#![allow(dead_code)]

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use vellum_core::model::{ColumnType, Columns, EntityId, Transaction, TransactionId};
use vellum_core::registry::{EntitySchema, SchemaRegistry};
use vellum_engine::{apply_engine_command, EngineCommand, EngineCommandResult};
use vellum_store::db;

pub fn registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(
            EntitySchema::builder("reference", "curie")
                .required_column("title", ColumnType::Text)
                .column("volume", ColumnType::Text)
                .column("page_count", ColumnType::Integer)
                .unversioned("authors")
                .build()
                .unwrap(),
        )
        .unwrap()
        .with(
            EntitySchema::builder("resource", "curie")
                .column("title", ColumnType::Text)
                .audited()
                .build()
                .unwrap(),
        )
        .unwrap()
}

pub fn setup() -> (Connection, SchemaRegistry) {
    let registry = registry();
    let mut conn = db::open_in_memory().unwrap();
    db::configure(&conn, Duration::from_millis(100)).unwrap();
    db::bootstrap(&mut conn, &registry).unwrap();
    (conn, registry)
}

pub fn open_file(path: &Path, registry: &SchemaRegistry, busy_timeout_ms: u64) -> Connection {
    let mut conn = db::open(path).unwrap();
    db::configure(&conn, Duration::from_millis(busy_timeout_ms)).unwrap();
    db::bootstrap(&mut conn, registry).unwrap();
    conn
}

pub fn id(s: &str) -> EntityId {
    EntityId::new(s)
}

pub fn tx(n: i64) -> TransactionId {
    TransactionId::new(n)
}

pub fn create(
    conn: &mut Connection,
    registry: &SchemaRegistry,
    curie: &str,
    title: &str,
) -> EngineCommandResult {
    apply_engine_command(
        EngineCommand::Create {
            entity_type: "reference".to_string(),
            columns: Columns::new().with("curie", curie).with("title", title),
        },
        conn,
        registry,
        Some("curator"),
    )
    .unwrap()
}

pub fn update_title(
    conn: &mut Connection,
    registry: &SchemaRegistry,
    curie: &str,
    title: &str,
) -> EngineCommandResult {
    apply_engine_command(
        EngineCommand::Update {
            entity_type: "reference".to_string(),
            entity_id: id(curie),
            changes: Columns::new().with("title", title),
        },
        conn,
        registry,
        Some("curator"),
    )
    .unwrap()
}

pub fn delete(conn: &mut Connection, registry: &SchemaRegistry, curie: &str) -> Transaction {
    apply_engine_command(
        EngineCommand::Delete {
            entity_type: "reference".to_string(),
            entity_id: id(curie),
        },
        conn,
        registry,
        Some("curator"),
    )
    .unwrap()
    .transaction
}

pub fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |r| r.get(0)).unwrap()
}
