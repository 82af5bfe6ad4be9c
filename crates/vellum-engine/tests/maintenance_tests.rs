//! Chain verification and `_mod` flag rebuilds against a real store

mod common;

use common::*;
use vellum_core::errors::ExErrorKind;
use vellum_core::timeline::ChainViolation;
use vellum_core::ChangeDetection;
use vellum_engine::{rebuild_change_flags, show_changesets_with, verify_all, verify_chain};

#[test]
fn test_engine_written_chain_is_healthy() {
    let (mut conn, registry) = setup();
    create(&mut conn, &registry, "R1", "Bob");
    update_title(&mut conn, &registry, "R1", "new title");
    delete(&mut conn, &registry, "R1");
    create(&mut conn, &registry, "R1", "Back again");

    let report = verify_chain(&conn, &registry, "reference", &id("R1")).unwrap();
    assert!(report.is_healthy(), "{:?}", report.violations);
    assert_eq!(report.version_count, 4);
    assert!(verify_all(&conn, &registry, "reference").unwrap().is_empty());
}

#[test]
fn test_corrupted_flags_are_detected_and_rebuilt() {
    let (mut conn, registry) = setup();
    create(&mut conn, &registry, "R1", "Bob");
    let second = update_title(&mut conn, &registry, "R1", "new title");
    create(&mut conn, &registry, "R2", "Alice");

    conn.execute(
        "UPDATE reference_version SET title_mod = 0, volume_mod = 1 WHERE transaction_id = ?1",
        [second.transaction.id.get()],
    )
    .unwrap();

    let report = verify_chain(&conn, &registry, "reference", &id("R1")).unwrap();
    assert_eq!(report.violations.len(), 1);
    assert!(matches!(
        &report.violations[0],
        ChainViolation::StaleFlags { transaction_id, columns }
            if *transaction_id == second.transaction.id
                && columns.contains("title")
                && columns.contains("volume")
    ));

    // The flag cache lies, value comparison does not
    let by_flags =
        show_changesets_with(&conn, &registry, "reference", &id("R1"), ChangeDetection::Flags)
            .unwrap();
    assert!(by_flags[1].change("title").is_none());
    let by_values =
        show_changesets_with(&conn, &registry, "reference", &id("R1"), ChangeDetection::Values)
            .unwrap();
    assert!(by_values[1].change("title").is_some());

    let rebuilt = rebuild_change_flags(&mut conn, &registry, "reference").unwrap();
    assert_eq!(rebuilt.entities, 2);
    assert_eq!(rebuilt.rows_rewritten, 1);

    let report = verify_chain(&conn, &registry, "reference", &id("R1")).unwrap();
    assert!(report.is_healthy());

    let again = rebuild_change_flags(&mut conn, &registry, "reference").unwrap();
    assert_eq!(again.rows_rewritten, 0);
}

#[test]
fn test_live_row_divergence_is_reported() {
    let (mut conn, registry) = setup();
    create(&mut conn, &registry, "R1", "Bob");
    conn.execute("UPDATE reference SET title = 'edited behind our back'", [])
        .unwrap();

    let reports = verify_all(&conn, &registry, "reference").unwrap();
    assert_eq!(reports.len(), 1);
    assert!(matches!(
        &reports[0].violations[0],
        ChainViolation::LiveRowDiverged { columns } if columns.contains("title")
    ));
}

#[test]
fn test_rebuild_unknown_type_fails() {
    let (mut conn, registry) = setup();
    let err = rebuild_change_flags(&mut conn, &registry, "nope").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::UnknownEntityType);
}
