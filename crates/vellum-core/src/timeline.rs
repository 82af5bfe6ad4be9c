//! Transaction-axis reasoning over one entity's version chain.
//!
//! A well-formed chain, sorted by `transaction_id`, satisfies:
//! - row *n*'s `end_transaction_id` equals row *n+1*'s `transaction_id`;
//! - `transaction_id < end_transaction_id` whenever the end is set;
//! - exactly the last row is open (`end_transaction_id = NULL`);
//! - the first row is an insert, and a delete is only ever followed by an insert;
//! - every row's `_mod` flags equal the recomputed diff.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::diff::stale_flags;
use crate::model::{Columns, OperationKind, TransactionId, VersionRow};
use crate::registry::ColumnDescriptor;

/// The row that was current at `transaction_id`, if any.
///
/// `rows` must be sorted by transaction id.
pub fn covering_row(rows: &[VersionRow], transaction_id: TransactionId) -> Option<&VersionRow> {
    rows.iter().rev().find(|row| row.covers(transaction_id))
}

/// The open row, if the chain has one
pub fn open_row(rows: &[VersionRow]) -> Option<&VersionRow> {
    rows.iter().rev().find(|row| row.is_open())
}

/// One way a stored chain can break its invariants
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainViolation {
    /// The chain has no rows at all
    Empty,
    /// The first row is not an insert
    FirstRowNotInsert { transaction_id: TransactionId },
    /// Two rows share a transaction id, or ids are not increasing
    NotIncreasing {
        transaction_id: TransactionId,
        next_transaction_id: TransactionId,
    },
    /// A closed row does not end where its successor starts
    Discontinuous {
        transaction_id: TransactionId,
        end_transaction_id: Option<TransactionId>,
        next_transaction_id: TransactionId,
    },
    /// A row ends at or before it starts
    EmptyInterval {
        transaction_id: TransactionId,
        end_transaction_id: TransactionId,
    },
    /// The last row is closed, so nothing is current
    LastRowClosed { transaction_id: TransactionId },
    /// More than one row is open
    MultipleOpenRows { count: usize },
    /// An update or delete follows a delete without a fresh insert
    MutationAfterDelete { transaction_id: TransactionId },
    /// The cached `_mod` flags disagree with the recomputed diff
    StaleFlags {
        transaction_id: TransactionId,
        columns: BTreeSet<String>,
    },
    /// The open row is live but the live table has no row
    LiveRowMissing,
    /// A live row exists although the open row is a delete
    LiveRowAfterDelete,
    /// The live row differs from the open row's snapshot
    LiveRowDiverged { columns: BTreeSet<String> },
}

impl std::fmt::Display for ChainViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainViolation::Empty => write!(f, "no version rows"),
            ChainViolation::FirstRowNotInsert { transaction_id } => {
                write!(f, "first row (tx {}) is not an insert", transaction_id)
            }
            ChainViolation::NotIncreasing {
                transaction_id,
                next_transaction_id,
            } => write!(
                f,
                "transaction ids not increasing: {} then {}",
                transaction_id, next_transaction_id
            ),
            ChainViolation::Discontinuous {
                transaction_id,
                end_transaction_id,
                next_transaction_id,
            } => write!(
                f,
                "row {} ends at {:?} but next row starts at {}",
                transaction_id,
                end_transaction_id.map(|t| t.get()),
                next_transaction_id
            ),
            ChainViolation::EmptyInterval {
                transaction_id,
                end_transaction_id,
            } => write!(
                f,
                "row {} ends at {} (not after its start)",
                transaction_id, end_transaction_id
            ),
            ChainViolation::LastRowClosed { transaction_id } => {
                write!(f, "last row {} is closed", transaction_id)
            }
            ChainViolation::MultipleOpenRows { count } => write!(f, "{} open rows", count),
            ChainViolation::MutationAfterDelete { transaction_id } => {
                write!(f, "row {} mutates a deleted entity", transaction_id)
            }
            ChainViolation::StaleFlags {
                transaction_id,
                columns,
            } => write!(
                f,
                "row {} has stale change flags for {:?}",
                transaction_id, columns
            ),
            ChainViolation::LiveRowMissing => write!(f, "entity is current but has no live row"),
            ChainViolation::LiveRowAfterDelete => write!(f, "entity is deleted but has a live row"),
            ChainViolation::LiveRowDiverged { columns } => {
                write!(f, "live row differs from open version in {:?}", columns)
            }
        }
    }
}

/// Check `rows` (sorted by transaction id) against the chain invariants
pub fn check_chain(columns: &[ColumnDescriptor], rows: &[VersionRow]) -> Vec<ChainViolation> {
    let mut violations = Vec::new();

    let Some(first) = rows.first() else {
        violations.push(ChainViolation::Empty);
        return violations;
    };

    if first.operation != OperationKind::Insert {
        violations.push(ChainViolation::FirstRowNotInsert {
            transaction_id: first.transaction_id,
        });
    }

    let open_count = rows.iter().filter(|r| r.is_open()).count();
    if open_count > 1 {
        violations.push(ChainViolation::MultipleOpenRows { count: open_count });
    }

    for pair in rows.windows(2) {
        let (row, next) = (&pair[0], &pair[1]);
        if next.transaction_id <= row.transaction_id {
            violations.push(ChainViolation::NotIncreasing {
                transaction_id: row.transaction_id,
                next_transaction_id: next.transaction_id,
            });
        }
        if row.end_transaction_id != Some(next.transaction_id) {
            violations.push(ChainViolation::Discontinuous {
                transaction_id: row.transaction_id,
                end_transaction_id: row.end_transaction_id,
                next_transaction_id: next.transaction_id,
            });
        }
        if row.is_delete() && next.operation != OperationKind::Insert {
            violations.push(ChainViolation::MutationAfterDelete {
                transaction_id: next.transaction_id,
            });
        }
    }

    for row in rows {
        if let Some(end) = row.end_transaction_id {
            if end <= row.transaction_id {
                violations.push(ChainViolation::EmptyInterval {
                    transaction_id: row.transaction_id,
                    end_transaction_id: end,
                });
            }
        }
    }

    if let Some(last) = rows.last() {
        if !last.is_open() {
            violations.push(ChainViolation::LastRowClosed {
                transaction_id: last.transaction_id,
            });
        }
    }

    let mut previous: Option<&VersionRow> = None;
    for row in rows {
        let stale = stale_flags(columns, previous, row);
        if !stale.is_empty() {
            violations.push(ChainViolation::StaleFlags {
                transaction_id: row.transaction_id,
                columns: stale,
            });
        }
        previous = Some(row);
    }

    violations
}

/// Compare the live row against the open version row
pub fn check_live(
    columns: &[ColumnDescriptor],
    open: Option<&VersionRow>,
    live: Option<&Columns>,
) -> Option<ChainViolation> {
    match (open, live) {
        (Some(row), None) if !row.is_delete() => Some(ChainViolation::LiveRowMissing),
        (Some(row), Some(_)) if row.is_delete() => Some(ChainViolation::LiveRowAfterDelete),
        (None, Some(_)) => Some(ChainViolation::LiveRowAfterDelete),
        (Some(row), Some(live)) => {
            let diverged: BTreeSet<String> = columns
                .iter()
                .filter(|c| row.columns.get(&c.name) != live.get(&c.name))
                .map(|c| c.name.clone())
                .collect();
            (!diverged.is_empty()).then_some(ChainViolation::LiveRowDiverged { columns: diverged })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::changed_columns;
    use crate::model::{ColumnType, EntityId};

    fn descriptors() -> Vec<ColumnDescriptor> {
        vec![ColumnDescriptor::new("title", ColumnType::Text, true)]
    }

    /// Build a well-formed chain from (operation, title) steps at tx 1, 2, ...
    fn chain(steps: &[(OperationKind, &str)]) -> Vec<VersionRow> {
        let mut rows: Vec<VersionRow> = Vec::new();
        for (i, (op, title)) in steps.iter().enumerate() {
            let tx = TransactionId::new(i as i64 + 1);
            if let Some(prev) = rows.last_mut() {
                prev.end_transaction_id = Some(tx);
            }
            let columns = Columns::new().with("title", *title);
            let changed = changed_columns(
                &descriptors(),
                *op,
                rows.last().map(|r| &r.columns),
                &columns,
            );
            rows.push(VersionRow {
                entity_id: EntityId::new("R1"),
                transaction_id: tx,
                end_transaction_id: None,
                operation: *op,
                columns,
                changed,
            });
        }
        rows
    }

    #[test]
    fn test_well_formed_chain_has_no_violations() {
        let rows = chain(&[
            (OperationKind::Insert, "Bob"),
            (OperationKind::Update, "new title"),
            (OperationKind::Delete, "new title"),
            (OperationKind::Insert, "Bob"),
        ]);
        assert!(check_chain(&descriptors(), &rows).is_empty());
    }

    #[test]
    fn test_covering_row_picks_interval() {
        let rows = chain(&[
            (OperationKind::Insert, "Bob"),
            (OperationKind::Update, "new title"),
        ]);
        let at_one = covering_row(&rows, TransactionId::new(1)).unwrap();
        assert_eq!(at_one.columns.get("title"), &"Bob".into());
        let later = covering_row(&rows, TransactionId::new(99)).unwrap();
        assert_eq!(later.transaction_id, TransactionId::new(2));
        assert!(covering_row(&rows, TransactionId::new(0)).is_none());
    }

    #[test]
    fn test_detects_gap_and_closed_tail() {
        let mut rows = chain(&[
            (OperationKind::Insert, "Bob"),
            (OperationKind::Update, "new title"),
        ]);
        rows[0].end_transaction_id = Some(TransactionId::new(5));
        rows[1].end_transaction_id = Some(TransactionId::new(3));

        let violations = check_chain(&descriptors(), &rows);
        assert!(violations
            .iter()
            .any(|v| matches!(v, ChainViolation::Discontinuous { .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, ChainViolation::LastRowClosed { .. })));
    }

    #[test]
    fn test_detects_two_open_rows() {
        let mut rows = chain(&[
            (OperationKind::Insert, "Bob"),
            (OperationKind::Update, "new title"),
        ]);
        rows[0].end_transaction_id = None;
        let violations = check_chain(&descriptors(), &rows);
        assert!(violations.contains(&ChainViolation::MultipleOpenRows { count: 2 }));
    }

    #[test]
    fn test_detects_stale_flags_and_update_after_delete() {
        let mut rows = chain(&[
            (OperationKind::Insert, "Bob"),
            (OperationKind::Delete, "Bob"),
            (OperationKind::Update, "x"),
        ]);
        rows[2].changed.clear();
        let violations = check_chain(&descriptors(), &rows);
        assert!(violations.contains(&ChainViolation::MutationAfterDelete {
            transaction_id: TransactionId::new(3)
        }));
        assert!(violations
            .iter()
            .any(|v| matches!(v, ChainViolation::StaleFlags { .. })));
    }

    #[test]
    fn test_live_row_consistency() {
        let rows = chain(&[(OperationKind::Insert, "Bob")]);
        let open = rows.last();
        let same = Columns::new().with("title", "Bob");
        let other = Columns::new().with("title", "Robert");

        assert_eq!(check_live(&descriptors(), open, Some(&same)), None);
        assert_eq!(
            check_live(&descriptors(), open, None),
            Some(ChainViolation::LiveRowMissing)
        );
        assert!(matches!(
            check_live(&descriptors(), open, Some(&other)),
            Some(ChainViolation::LiveRowDiverged { .. })
        ));

        let deleted = chain(&[(OperationKind::Insert, "Bob"), (OperationKind::Delete, "Bob")]);
        assert_eq!(check_live(&descriptors(), deleted.last(), None), None);
        assert_eq!(
            check_live(&descriptors(), deleted.last(), Some(&same)),
            Some(ChainViolation::LiveRowAfterDelete)
        );
    }

    #[test]
    fn test_empty_chain() {
        assert_eq!(check_chain(&descriptors(), &[]), vec![ChainViolation::Empty]);
    }
}
