// Version and live table repositories against generated DDL

use chrono::Utc;
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::time::Duration;
use vellum_core::errors::ExErrorKind;
use vellum_core::model::{ColumnType, Columns, EntityId, OperationKind, VersionRow};
use vellum_core::registry::{EntitySchema, SchemaRegistry};
use vellum_store::{db, LedgerRepo, LiveRepo, VersionRepo};

fn registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(
            EntitySchema::builder("reference", "curie")
                .required_column("title", ColumnType::Text)
                .column("page_count", ColumnType::Integer)
                .column("open_access", ColumnType::Boolean)
                .build()
                .unwrap(),
        )
        .unwrap()
        .with(
            EntitySchema::builder("author", "author_id")
                .integer_key()
                .column("name", ColumnType::Text)
                .build()
                .unwrap(),
        )
        .unwrap()
}

fn setup() -> (Connection, SchemaRegistry) {
    let registry = registry();
    let mut conn = db::open_in_memory().unwrap();
    db::configure(&conn, Duration::from_millis(100)).unwrap();
    db::bootstrap(&mut conn, &registry).unwrap();
    (conn, registry)
}

fn row(id: &str, tx: vellum_core::TransactionId, op: OperationKind, title: &str) -> VersionRow {
    VersionRow {
        entity_id: EntityId::new(id),
        transaction_id: tx,
        end_transaction_id: None,
        operation: op,
        columns: Columns::new()
            .with("title", title)
            .with("page_count", 12i64)
            .with("open_access", true),
        changed: BTreeSet::from(["title".to_string()]),
    }
}

#[test]
fn test_insert_close_and_read_chain() {
    let (conn, registry) = setup();
    let schema = registry.get("reference").unwrap();
    let id = EntityId::new("R1");

    let t1 = LedgerRepo::allocate(&conn, Utc::now(), None).unwrap().id;
    VersionRepo::insert(&conn, schema, &row("R1", t1, OperationKind::Insert, "Bob")).unwrap();

    let t2 = LedgerRepo::allocate(&conn, Utc::now(), None).unwrap().id;
    VersionRepo::close(&conn, schema, &id, t1, t2).unwrap();
    VersionRepo::insert(&conn, schema, &row("R1", t2, OperationKind::Update, "new title")).unwrap();

    let chain = VersionRepo::chain(&conn, schema, &id).unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].end_transaction_id, Some(t2));
    assert_eq!(chain[1].operation, OperationKind::Update);
    assert_eq!(chain[1].columns.get("open_access"), &true.into());
    assert!(chain[1].is_changed("title"));
    assert!(!chain[1].is_changed("page_count"));

    let open = VersionRepo::open_row(&conn, schema, &id).unwrap().unwrap();
    assert_eq!(open.transaction_id, t2);
    assert_eq!(
        VersionRepo::written_by(&conn, schema, t2).unwrap(),
        vec![(id.clone(), OperationKind::Update)]
    );
}

#[test]
fn test_closing_an_already_closed_row_conflicts() {
    let (conn, registry) = setup();
    let schema = registry.get("reference").unwrap();
    let id = EntityId::new("R1");

    let t1 = LedgerRepo::allocate(&conn, Utc::now(), None).unwrap().id;
    let t2 = LedgerRepo::allocate(&conn, Utc::now(), None).unwrap().id;
    let t3 = LedgerRepo::allocate(&conn, Utc::now(), None).unwrap().id;
    VersionRepo::insert(&conn, schema, &row("R1", t1, OperationKind::Insert, "Bob")).unwrap();
    VersionRepo::close(&conn, schema, &id, t1, t2).unwrap();

    let err = VersionRepo::close(&conn, schema, &id, t1, t3).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Conflict);
    assert!(err.is_retryable());
}

#[test]
fn test_second_open_row_conflicts() {
    let (conn, registry) = setup();
    let schema = registry.get("reference").unwrap();

    let t1 = LedgerRepo::allocate(&conn, Utc::now(), None).unwrap().id;
    let t2 = LedgerRepo::allocate(&conn, Utc::now(), None).unwrap().id;
    VersionRepo::insert(&conn, schema, &row("R1", t1, OperationKind::Insert, "Bob")).unwrap();

    let err = VersionRepo::insert(&conn, schema, &row("R1", t2, OperationKind::Update, "x"))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Conflict);

    let err = VersionRepo::insert(&conn, schema, &row("R1", t1, OperationKind::Update, "x"))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Conflict);
}

#[test]
fn test_set_flags_rewrites_cache_only() {
    let (conn, registry) = setup();
    let schema = registry.get("reference").unwrap();
    let id = EntityId::new("R1");

    let t1 = LedgerRepo::allocate(&conn, Utc::now(), None).unwrap().id;
    VersionRepo::insert(&conn, schema, &row("R1", t1, OperationKind::Insert, "Bob")).unwrap();
    let all = BTreeSet::from([
        "title".to_string(),
        "page_count".to_string(),
        "open_access".to_string(),
    ]);
    VersionRepo::set_flags(&conn, schema, &id, t1, &all).unwrap();

    let open = VersionRepo::open_row(&conn, schema, &id).unwrap().unwrap();
    assert_eq!(open.changed, all);
    assert_eq!(open.columns.get("title"), &"Bob".into());
}

#[test]
fn test_non_integer_flag_is_a_decode_error() {
    let (conn, registry) = setup();
    let schema = registry.get("reference").unwrap();
    let id = EntityId::new("R1");

    let t1 = LedgerRepo::allocate(&conn, Utc::now(), None).unwrap().id;
    VersionRepo::insert(&conn, schema, &row("R1", t1, OperationKind::Insert, "Bob")).unwrap();
    conn.execute("UPDATE reference_version SET title_mod = 'yes'", [])
        .unwrap();

    let err = VersionRepo::chain(&conn, schema, &id).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Serialization);
    assert!(err.to_string().contains("title_mod"));
}

#[test]
fn test_live_repo_round_trip_and_missing_rows() {
    let (conn, registry) = setup();
    let schema = registry.get("author").unwrap();
    let id = EntityId::new("7");

    LiveRepo::insert(&conn, schema, &id, &Columns::new().with("name", "Ada")).unwrap();
    let dup = LiveRepo::insert(&conn, schema, &id, &Columns::new().with("name", "Ada"))
        .unwrap_err();
    assert_eq!(dup.kind(), ExErrorKind::AlreadyExists);

    LiveRepo::update(&conn, schema, &id, &Columns::new().with("name", "Grace")).unwrap();
    let live = LiveRepo::get(&conn, schema, &id).unwrap().unwrap();
    assert_eq!(live.get("name"), &"Grace".into());

    LiveRepo::delete(&conn, schema, &id).unwrap();
    assert!(LiveRepo::get(&conn, schema, &id).unwrap().is_none());
    assert_eq!(
        LiveRepo::delete(&conn, schema, &id).unwrap_err().kind(),
        ExErrorKind::NotFound
    );
}
