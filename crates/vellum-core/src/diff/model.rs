//! Changeset output types.
//!
//! Collections use `BTreeMap` so serialized history is deterministic.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{ColumnValue, OperationKind, Transaction};

/// Old and new value of one column across one transaction.
///
/// `None` stands for SQL NULL (or "did not exist yet" for an insert).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnChange {
    pub old: Option<ColumnValue>,
    pub new: Option<ColumnValue>,
}

impl ColumnChange {
    pub fn new(old: &ColumnValue, new: &ColumnValue) -> Self {
        Self {
            old: old.clone().into_option(),
            new: new.clone().into_option(),
        }
    }
}

/// Everything one transaction did to one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Changeset {
    pub transaction: Transaction,
    pub operation: OperationKind,
    #[serde(rename = "changeset")]
    pub changes: BTreeMap<String, ColumnChange>,
}

impl Changeset {
    /// True when the entity ceased to exist in this transaction
    pub fn is_delete(&self) -> bool {
        self.operation == OperationKind::Delete
    }

    pub fn change(&self, column: &str) -> Option<&ColumnChange> {
        self.changes.get(column)
    }
}

/// How the history reader decides which columns changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeDetection {
    /// Trust the stored `_mod` flags
    Flags,
    /// Compare adjacent snapshots (authoritative)
    #[default]
    Values,
}
