#![allow(clippy::unwrap_used, clippy::expect_used)]

use vellum_core::errors::{ExError, ExErrorKind, VersioningError};
use vellum_core::logging_facility::{init_test_capture, EVENT_END, EVENT_END_ERROR, EVENT_START};
use vellum_core::{log_op_end, log_op_error, log_op_start};
use vellum_core_types::schema::{FIELD_ERR_CODE, FIELD_ERR_KIND};

#[test]
fn test_start_event_carries_fields() {
    let capture = init_test_capture();
    let op = "capture_start_unique_1";

    log_op_start!(op, entity_type = "reference", entity_id = "R1");

    let events = capture.events_for(op);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(events[0].field("entity_type"), Some("reference"));
    assert_eq!(events[0].field("entity_id"), Some("R1"));
}

#[test]
fn test_end_event_records_duration() {
    let capture = init_test_capture();
    let op = "capture_end_unique_2";

    log_op_end!(op, duration_ms = 42u64);

    let events = capture.events_for(op);
    assert_eq!(events.len(), 1);
    assert!(events[0].is(op, EVENT_END));
    assert_eq!(events[0].field("duration_ms"), Some("42"));
}

#[test]
fn test_error_event_records_kind_and_code() {
    let capture = init_test_capture();
    let op = "capture_error_unique_3";

    let err: ExError = VersioningError::HistoryNotFound {
        entity_type: "reference".into(),
        entity_id: "R9".into(),
    }
    .into();
    log_op_error!(op, &err, duration_ms = 1u64);

    let events = capture.events_for(op);
    assert_eq!(events.len(), 1);
    assert!(events[0].is(op, EVENT_END_ERROR));
    assert_eq!(events[0].field(FIELD_ERR_CODE), Some("ERR_NOT_FOUND"));
    assert_eq!(
        events[0].field(FIELD_ERR_KIND),
        Some(format!("{:?}", ExErrorKind::NotFound).as_str())
    );
}

#[test]
fn test_one_start_one_end_per_operation() {
    let capture = init_test_capture();
    let op = "capture_boundary_unique_4";

    log_op_start!(op);
    log_op_end!(op, duration_ms = 0u64);

    assert_eq!(capture.count_events(|e| e.is(op, EVENT_START)), 1);
    assert_eq!(capture.count_events(|e| e.is(op, EVENT_END)), 1);
    assert_eq!(capture.count_events(|e| e.is(op, EVENT_END_ERROR)), 0);
}
