use vellum_core::errors::{ExError, ExErrorKind, VersioningError};
use vellum_core::model::{ColumnType, TransactionId};

#[test]
fn test_history_not_found_maps_to_not_found() {
    let ex_err: ExError = VersioningError::HistoryNotFound {
        entity_type: "reference".to_string(),
        entity_id: "R1".to_string(),
    }
    .into();

    assert_eq!(ex_err.kind(), ExErrorKind::NotFound);
    assert_eq!(ex_err.code(), "ERR_NOT_FOUND");
    assert_eq!(ex_err.entity_type(), Some("reference"));
    assert_eq!(ex_err.entity_id(), Some("R1"));
}

#[test]
fn test_no_historical_state_distinct_from_not_found() {
    let ex_err: ExError = VersioningError::NoHistoricalState {
        entity_type: "reference".to_string(),
        entity_id: "R1".to_string(),
        transaction_id: TransactionId::new(3),
    }
    .into();

    assert_eq!(ex_err.kind(), ExErrorKind::NoHistoricalState);
    assert_ne!(ex_err.kind(), ExErrorKind::NotFound);
    assert_eq!(ex_err.transaction_id(), Some(TransactionId::new(3)));
}

#[test]
fn test_schema_errors_keep_entity_type() {
    let ex_err: ExError = VersioningError::TypeMismatch {
        entity_type: "reference".to_string(),
        column: "page_count".to_string(),
        expected: ColumnType::Integer,
        found: "text".to_string(),
    }
    .into();

    assert_eq!(ex_err.kind(), ExErrorKind::TypeMismatch);
    assert!(ex_err.message().contains("page_count"));
    assert!(ex_err.message().contains("integer"));
}

#[test]
fn test_error_kind_codes_are_unique() {
    let kinds = [
        ExErrorKind::InvalidInput,
        ExErrorKind::UnknownEntityType,
        ExErrorKind::UnknownColumn,
        ExErrorKind::TypeMismatch,
        ExErrorKind::NullViolation,
        ExErrorKind::InvalidSchema,
        ExErrorKind::NotFound,
        ExErrorKind::NoHistoricalState,
        ExErrorKind::AlreadyExists,
        ExErrorKind::Conflict,
        ExErrorKind::RevertRejected,
        ExErrorKind::InvariantViolation,
        ExErrorKind::Persistence,
        ExErrorKind::Serialization,
        ExErrorKind::Io,
        ExErrorKind::Config,
        ExErrorKind::Internal,
    ];
    let codes: std::collections::BTreeSet<_> = kinds.iter().map(|k| k.code()).collect();
    assert_eq!(codes.len(), kinds.len());
    assert!(codes.iter().all(|c| c.starts_with("ERR_")));
}

#[test]
fn test_source_chain_is_exposed() {
    use std::error::Error;

    let inner = ExError::new(ExErrorKind::Persistence).with_message("disk I/O error");
    let outer = ExError::new(ExErrorKind::Internal)
        .with_op("commit")
        .with_source(inner);

    let source = outer.source().expect("source");
    assert!(source.to_string().contains("ERR_PERSISTENCE"));
}
