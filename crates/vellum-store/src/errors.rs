//! Store-side constructors for `ExError`
//!
//! SQLite failures are classified here so callers see a stable kind:
//! lock contention is `Conflict`, a uniqueness failure is `AlreadyExists`
//! (or `Conflict` on version tables, see [`conflict_on_unique`]), and
//! everything else is `Persistence`.

use rusqlite::ErrorCode;
use vellum_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

pub fn checksum_mismatch(migration_id: &str, recorded: &str, embedded: &str) -> ExError {
    ExError::new(ExErrorKind::InvariantViolation)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, recorded, embedded
        ))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn is_lock_contention(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Classify a rusqlite error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    let kind = if is_lock_contention(&err) {
        ExErrorKind::Conflict
    } else if is_unique_violation(&err) {
        ExErrorKind::AlreadyExists
    } else {
        ExErrorKind::Persistence
    };
    ExError::new(kind)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Like [`from_rusqlite`] but a uniqueness failure is a lost-update `Conflict`.
///
/// Used for version-table writes, where a duplicate `(pk, transaction_id)`
/// or a second open row means another writer got there first.
pub fn conflict_on_unique(err: rusqlite::Error) -> ExError {
    if is_unique_violation(&err) {
        ExError::new(ExErrorKind::Conflict)
            .with_op("sqlite")
            .with_message(err.to_string())
    } else {
        from_rusqlite(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_unique_violation_classification() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id TEXT PRIMARY KEY, v TEXT UNIQUE)")
            .unwrap();
        conn.execute("INSERT INTO t VALUES ('a', 'x')", []).unwrap();

        let dup_pk = conn
            .execute("INSERT INTO t VALUES ('a', 'y')", [])
            .unwrap_err();
        assert_eq!(from_rusqlite(dup_pk).kind(), ExErrorKind::AlreadyExists);

        let dup_unique = conn
            .execute("INSERT INTO t VALUES ('b', 'x')", [])
            .unwrap_err();
        assert_eq!(conflict_on_unique(dup_unique).kind(), ExErrorKind::Conflict);
    }

    #[test]
    fn test_other_errors_are_persistence() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn.execute("SELECT * FROM missing", []).unwrap_err();
        assert_eq!(from_rusqlite(err).kind(), ExErrorKind::Persistence);
    }
}
