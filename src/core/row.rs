// Copyright 2025 Kvexec Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Row type and the row-read capability
//!
//! A [`Row`] is a raw, ordered sequence of cell values as pulled from the
//! underlying partition scan. [`TupleRead`] is the capability interface
//! every row-like container implements (raw rows, projected tuples,
//! merged tuples), so evaluation code depends only on the capability.

use std::ops::Index;
use std::sync::Arc;

use super::value::Value;

/// Read capability over any row-like container
///
/// `read_column` returns `None` when the slot holds no value at all: the
/// slot is outside the container, or the tuple's present-bitset marks it
/// unset (a LEFT join with no match). A present SQL NULL is `Some(&Value::Null)`;
/// the two cases are distinct in three-valued evaluation.
pub trait TupleRead {
    /// Read the value at a slot, or `None` when the slot is absent
    fn read_column(&self, slot: usize) -> Option<&Value>;

    /// Whether the slot holds a value
    fn present(&self, slot: usize) -> bool {
        self.read_column(slot).is_some()
    }

    /// Number of addressable slots
    fn slot_count(&self) -> usize;
}

/// Internal storage for Row - either owned Vec or shared Arc
///
/// Hash-cache candidate rows are shared across every tuple they expand
/// into, so the shared form clones in O(1).
#[derive(Debug, Clone)]
enum RowStorage {
    /// Owned storage - supports mutation
    Owned(Vec<Value>),
    /// Shared storage - O(1) clone
    Shared(Arc<[Value]>),
}

impl Default for RowStorage {
    fn default() -> Self {
        RowStorage::Owned(Vec::new())
    }
}

impl RowStorage {
    #[inline]
    fn as_slice(&self) -> &[Value] {
        match self {
            RowStorage::Owned(v) => v,
            RowStorage::Shared(a) => a,
        }
    }
}

impl PartialEq for RowStorage {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

/// A raw partition-local row containing ordered cell values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    storage: RowStorage,
}

impl Row {
    /// Create a new empty row
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a row from a vector of values
    #[inline]
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            storage: RowStorage::Owned(values),
        }
    }

    /// Create a row backed by shared storage (O(1) clone)
    #[inline]
    pub fn shared(values: Arc<[Value]>) -> Self {
        Self {
            storage: RowStorage::Shared(values),
        }
    }

    /// Convert this row into shared storage, making future clones O(1)
    pub fn into_shared(self) -> Self {
        match self.storage {
            RowStorage::Owned(v) => Self {
                storage: RowStorage::Shared(Arc::from(v)),
            },
            shared @ RowStorage::Shared(_) => Self { storage: shared },
        }
    }

    /// Get a value by index
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.storage.as_slice().get(index)
    }

    /// Number of values in the row
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.as_slice().len()
    }

    /// Check if the row has no values
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the values
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.storage.as_slice().iter()
    }

    /// View the values as a slice
    #[inline]
    pub fn values(&self) -> &[Value] {
        self.storage.as_slice()
    }

    /// Consume the row, returning its values
    pub fn into_values(self) -> Vec<Value> {
        match self.storage {
            RowStorage::Owned(v) => v,
            RowStorage::Shared(a) => a.to_vec(),
        }
    }
}

impl TupleRead for Row {
    #[inline]
    fn read_column(&self, slot: usize) -> Option<&Value> {
        self.get(slot)
    }

    #[inline]
    fn slot_count(&self) -> usize {
        self.len()
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        &self.storage.as_slice()[index]
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row::from_values(values)
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Row::from_values(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_access() {
        let row = Row::from_values(vec![Value::integer(1), Value::text("a")]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some(&Value::integer(1)));
        assert_eq!(row.get(1), Some(&Value::text("a")));
        assert_eq!(row.get(2), None);
        assert_eq!(row[1], Value::text("a"));
    }

    #[test]
    fn test_shared_storage_equality() {
        let owned = Row::from_values(vec![Value::integer(1), Value::Null]);
        let shared = owned.clone().into_shared();
        assert_eq!(owned, shared);
        assert_eq!(shared.clone(), shared);
    }

    #[test]
    fn test_tuple_read_capability() {
        let row = Row::from_values(vec![Value::integer(1), Value::Null]);
        assert_eq!(row.slot_count(), 2);
        assert!(row.present(0));
        // A stored NULL is present; only out-of-range slots are absent
        assert!(row.present(1));
        assert!(!row.present(5));
        assert_eq!(row.read_column(1), Some(&Value::Null));
    }
}
