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

//! Schema types for kvexec - column layouts and the present-value bitset
//!
//! A [`Schema`] describes the slot layout of a row source or a joined
//! destination. A [`ValueBitSet`] records which slots of a projected
//! tuple hold real data; LEFT joins with no match leave the right-side
//! slots unset.

use std::fmt;

use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

use super::types::DataType;

/// A column definition in a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaColumn {
    /// Slot index of the column (0-based)
    pub id: usize,

    /// Column name
    pub name: String,

    /// Data type of the column
    pub data_type: DataType,

    /// Whether the column can contain NULL values
    pub nullable: bool,
}

impl SchemaColumn {
    /// Create a new column definition
    pub fn new(id: usize, name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            id,
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// A schema describing an ordered column layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Source or destination name (table alias, join output name)
    name: String,

    /// Ordered column definitions
    columns: Vec<SchemaColumn>,

    /// Lowercased column name -> slot index
    index: FxHashMap<String, usize>,
}

impl Schema {
    /// Create a new schema from column definitions
    pub fn new(name: impl Into<String>, columns: Vec<SchemaColumn>) -> Self {
        let index = columns
            .iter()
            .map(|c| (c.name.to_lowercase(), c.id))
            .collect();
        Self {
            name: name.into(),
            columns,
            index,
        }
    }

    /// Schema name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if the schema has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get a column by slot index
    pub fn get_column(&self, index: usize) -> Option<&SchemaColumn> {
        self.columns.get(index)
    }

    /// Get a column's slot index by name (case-insensitive)
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_lowercase()).copied()
    }

    /// Get a column by name (case-insensitive)
    pub fn get_column_by_name(&self, name: &str) -> Option<&SchemaColumn> {
        self.get_column_index(name).map(|i| &self.columns[i])
    }

    /// Check whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_lowercase())
    }

    /// Column names in slot order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Iterate over the columns in slot order
    pub fn columns(&self) -> &[SchemaColumn] {
        &self.columns
    }
}

/// Builder for schemas
pub struct SchemaBuilder {
    name: String,
    columns: Vec<SchemaColumn>,
}

impl SchemaBuilder {
    /// Start a schema with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a non-nullable column
    pub fn add(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        let id = self.columns.len();
        self.columns.push(SchemaColumn::new(id, name, data_type, false));
        self
    }

    /// Add a nullable column
    pub fn add_nullable(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        let id = self.columns.len();
        self.columns.push(SchemaColumn::new(id, name, data_type, true));
        self
    }

    /// Build the schema
    pub fn build(self) -> Schema {
        Schema::new(self.name, self.columns)
    }
}

/// Present-value bitset addressing schema slots
///
/// One bit per slot of a schema; a set bit means the slot holds real
/// data. Word storage is inline for the common case of joined schemas
/// with at most 128 slots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueBitSet {
    words: SmallVec<[u64; 2]>,
    capacity: usize,
}

impl ValueBitSet {
    /// Create a bitset addressing `capacity` slots, all unset
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: smallvec![0u64; capacity.div_ceil(64)],
            capacity,
        }
    }

    /// Create a bitset with the given slots set
    pub fn from_slots(capacity: usize, slots: &[usize]) -> Self {
        let mut bitset = Self::with_capacity(capacity);
        for &slot in slots {
            bitset.set(slot);
        }
        bitset
    }

    /// Number of addressable slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mark a slot as present
    ///
    /// # Panics
    /// Panics if `slot` is beyond the bitset's capacity.
    pub fn set(&mut self, slot: usize) {
        assert!(slot < self.capacity, "slot {slot} out of bitset capacity");
        self.words[slot / 64] |= 1 << (slot % 64);
    }

    /// Mark a slot as unset
    pub fn clear(&mut self, slot: usize) {
        if slot < self.capacity {
            self.words[slot / 64] &= !(1 << (slot % 64));
        }
    }

    /// Whether a slot is present (false for out-of-range slots)
    pub fn get(&self, slot: usize) -> bool {
        if slot >= self.capacity {
            return false;
        }
        self.words[slot / 64] & (1 << (slot % 64)) != 0
    }

    /// Number of slots marked present
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether no slot is marked present
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Set every bit that is set in `other`
    ///
    /// Both bitsets must address the same schema; the larger capacity
    /// wins when they differ.
    pub fn union_with(&mut self, other: &ValueBitSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        self.capacity = self.capacity.max(other.capacity);
        for (word, &other_word) in self.words.iter_mut().zip(other.words.iter()) {
            *word |= other_word;
        }
    }

    /// Iterate over the indices of set slots in ascending order
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.capacity).filter(|&slot| self.get(slot))
    }
}

impl fmt::Display for ValueBitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, slot) in self.iter_set().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{slot}")?;
        }
        write!(f, "}}")
    }
}
