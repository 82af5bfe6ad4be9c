//! Change detection between adjacent version rows.
//!
//! [`changed_columns`] computes the `_mod` flags the writer stores;
//! [`build_changesets`] turns an ordered version chain into per-transaction
//! changesets for the history reader.

use std::collections::{BTreeMap, BTreeSet};

use crate::diff::model::{ChangeDetection, Changeset, ColumnChange};
use crate::errors::{Result, VersioningError};
use crate::model::{Columns, OperationKind, Transaction, TransactionId, VersionRow};
use crate::registry::ColumnDescriptor;

/// Columns whose value in `after` differs from `before`.
///
/// An insert starts a new lifetime, so it is compared against an all-null
/// state even when a delete row precedes it: it flags exactly its non-null
/// columns. A delete changes nothing.
pub fn changed_columns(
    columns: &[ColumnDescriptor],
    operation: OperationKind,
    before: Option<&Columns>,
    after: &Columns,
) -> BTreeSet<String> {
    let before = match operation {
        OperationKind::Delete => return BTreeSet::new(),
        OperationKind::Insert => None,
        OperationKind::Update => before,
    };
    columns
        .iter()
        .filter(|col| {
            let new = after.get(&col.name);
            match before {
                Some(prev) => prev.get(&col.name) != new,
                None => !new.is_null(),
            }
        })
        .map(|col| col.name.clone())
        .collect()
}

/// Columns whose stored flag disagrees with the recomputed diff
pub fn stale_flags(
    columns: &[ColumnDescriptor],
    previous: Option<&VersionRow>,
    row: &VersionRow,
) -> BTreeSet<String> {
    let expected = changed_columns(
        columns,
        row.operation,
        previous.map(|p| &p.columns),
        &row.columns,
    );
    expected
        .symmetric_difference(&row.changed)
        .cloned()
        .collect()
}

/// Build one changeset per version row.
///
/// `rows` must belong to a single entity and be sorted by transaction id.
/// Every row's transaction must be present in `transactions`.
pub fn build_changesets(
    columns: &[ColumnDescriptor],
    rows: &[VersionRow],
    transactions: &BTreeMap<TransactionId, Transaction>,
    detection: ChangeDetection,
) -> Result<Vec<Changeset>> {
    let mut changesets = Vec::with_capacity(rows.len());
    let mut previous: Option<&VersionRow> = None;

    for row in rows {
        let transaction = transactions
            .get(&row.transaction_id)
            .cloned()
            .ok_or(VersioningError::MissingTransaction {
                transaction_id: row.transaction_id,
            })?;

        let changed = match detection {
            ChangeDetection::Flags => row.changed.clone(),
            ChangeDetection::Values => changed_columns(
                columns,
                row.operation,
                previous.map(|p| &p.columns),
                &row.columns,
            ),
        };

        let empty = Columns::new();
        let before = match previous {
            Some(p) if row.operation != OperationKind::Insert => &p.columns,
            _ => &empty,
        };
        let changes = columns
            .iter()
            .filter(|col| changed.contains(&col.name))
            .map(|col| {
                (
                    col.name.clone(),
                    ColumnChange::new(before.get(&col.name), row.columns.get(&col.name)),
                )
            })
            .collect();

        changesets.push(Changeset {
            transaction,
            operation: row.operation,
            changes,
        });
        previous = Some(row);
    }

    Ok(changesets)
}
