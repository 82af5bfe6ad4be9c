use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::columns::Columns;
use super::transaction::{EntityId, TransactionId};
use crate::errors::{Result, VersioningError};

/// Kind of mutation that produced a version row.
///
/// The numeric codes are what the `operation_type` column stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    pub fn code(&self) -> i64 {
        match self {
            OperationKind::Insert => 0,
            OperationKind::Update => 1,
            OperationKind::Delete => 2,
        }
    }

    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(OperationKind::Insert),
            1 => Ok(OperationKind::Update),
            2 => Ok(OperationKind::Delete),
            other => Err(VersioningError::InvalidOperationCode { code: other }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one entity as of one transaction.
///
/// `end_transaction_id = None` marks the row that is current. `changed`
/// holds the names of columns whose `_mod` flag is set; it is a cache of
/// the diff against the preceding row, never the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionRow {
    pub entity_id: EntityId,
    pub transaction_id: TransactionId,
    pub end_transaction_id: Option<TransactionId>,
    pub operation: OperationKind,
    pub columns: Columns,
    pub changed: BTreeSet<String>,
}

impl VersionRow {
    pub fn is_open(&self) -> bool {
        self.end_transaction_id.is_none()
    }

    pub fn is_delete(&self) -> bool {
        self.operation == OperationKind::Delete
    }

    /// True when this row was the current state at `transaction_id`
    pub fn covers(&self, transaction_id: TransactionId) -> bool {
        self.transaction_id <= transaction_id
            && self
                .end_transaction_id
                .map_or(true, |end| transaction_id < end)
    }

    pub fn is_changed(&self, column: &str) -> bool {
        self.changed.contains(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(start: i64, end: Option<i64>) -> VersionRow {
        VersionRow {
            entity_id: EntityId::new("R1"),
            transaction_id: TransactionId::new(start),
            end_transaction_id: end.map(TransactionId::new),
            operation: OperationKind::Update,
            columns: Columns::new(),
            changed: BTreeSet::new(),
        }
    }

    #[test]
    fn test_operation_codes_round_trip() {
        for op in [
            OperationKind::Insert,
            OperationKind::Update,
            OperationKind::Delete,
        ] {
            assert_eq!(OperationKind::from_code(op.code()).unwrap(), op);
        }
        assert!(OperationKind::from_code(9).is_err());
    }

    #[test]
    fn test_covers_is_half_open() {
        let r = row(3, Some(5));
        assert!(!r.covers(TransactionId::new(2)));
        assert!(r.covers(TransactionId::new(3)));
        assert!(r.covers(TransactionId::new(4)));
        assert!(!r.covers(TransactionId::new(5)));
    }

    #[test]
    fn test_open_row_covers_everything_after_start() {
        let r = row(3, None);
        assert!(r.is_open());
        assert!(r.covers(TransactionId::new(1_000)));
    }
}
