use serde::Serialize;
use std::collections::BTreeMap;

use super::value::ColumnValue;

/// Named column values of one entity state.
///
/// Ordered by column name so snapshots compare and serialize deterministically.
/// A column absent from the map reads as `ColumnValue::Null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Columns {
    values: BTreeMap<String, ColumnValue>,
}

impl Columns {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ColumnValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Value for `name`, `Null` when absent
    pub fn get(&self, name: &str) -> &ColumnValue {
        static NULL: ColumnValue = ColumnValue::Null;
        self.values.get(name).unwrap_or(&NULL)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ColumnValue> {
        self.values.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlay `other` on top of `self`; columns in `other` win
    pub fn merged_with(&self, other: &Columns) -> Columns {
        let mut values = self.values.clone();
        for (k, v) in &other.values {
            values.insert(k.clone(), v.clone());
        }
        Columns { values }
    }
}

impl<K: Into<String>, V: Into<ColumnValue>> FromIterator<(K, V)> for Columns {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Columns {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Columns {
    type Item = (String, ColumnValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ColumnValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
