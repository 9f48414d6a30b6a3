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

//! Tuple projection and merging
//!
//! [`ScanProjector`] lifts each raw partition row into a
//! [`ProjectedTuple`] over the joined destination schema, filling the
//! raw slots and leaving the join slots unset. [`merge_projected`]
//! widens a tuple with one cached right-side row, all-or-nothing: the
//! seed is untouched unless every selected right column copies cleanly.

use std::sync::Arc;

use crate::core::{Error, Result, Row, Schema, TupleRead, Value, ValueBitSet};

use super::join::JoinClause;

/// A row over the joined destination schema with per-slot presence
///
/// Unset slots read as absent (not NULL); a LEFT clause with no match
/// leaves its right-side slots unset all the way to the output.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedTuple {
    schema: Arc<Schema>,
    slots: Vec<Value>,
    present: ValueBitSet,
}

impl ProjectedTuple {
    /// Create a tuple with every slot unset
    pub fn empty(schema: Arc<Schema>) -> Self {
        let width = schema.column_count();
        Self {
            schema,
            slots: vec![Value::Null; width],
            present: ValueBitSet::with_capacity(width),
        }
    }

    /// Destination schema of the tuple
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Which slots hold real data
    pub fn present_bitset(&self) -> &ValueBitSet {
        &self.present
    }

    /// Store a value into a slot and mark it present
    pub fn set(&mut self, slot: usize, value: Value) -> Result<()> {
        if slot >= self.slots.len() {
            return Err(Error::ColumnIndexOutOfBounds { index: slot });
        }
        self.slots[slot] = value;
        self.present.set(slot);
        Ok(())
    }

    /// Flatten into an output row in destination slot order
    ///
    /// Unset slots come out as NULL; the absent/NULL distinction only
    /// matters while the tuple is still being joined and filtered.
    pub fn into_row(self) -> Row {
        let present = self.present;
        Row::from_values(
            self.slots
                .into_iter()
                .enumerate()
                .map(|(slot, value)| if present.get(slot) { value } else { Value::Null })
                .collect(),
        )
    }
}

impl TupleRead for ProjectedTuple {
    fn read_column(&self, slot: usize) -> Option<&Value> {
        if self.present.get(slot) {
            self.slots.get(slot)
        } else {
            None
        }
    }

    fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

/// Projection from raw partition rows into the destination schema
///
/// `source_columns[dest]` names the raw column that fills destination
/// slot `dest`; destination slots past the projection stay unset for
/// the join clauses to fill.
#[derive(Debug, Clone)]
pub struct ScanProjector {
    schema: Arc<Schema>,
    source_columns: Vec<usize>,
}

impl ScanProjector {
    /// Create a projector, validating it fits the destination schema
    pub fn new(schema: Arc<Schema>, source_columns: Vec<usize>) -> Result<Self> {
        if source_columns.len() > schema.column_count() {
            return Err(Error::ProjectionTooWide {
                expected: schema.column_count(),
                got: source_columns.len(),
            });
        }
        Ok(Self {
            schema,
            source_columns,
        })
    }

    /// Identity projection over a schema's full width
    pub fn identity(schema: Arc<Schema>) -> Self {
        let source_columns = (0..schema.column_count()).collect();
        Self {
            schema,
            source_columns,
        }
    }

    /// Destination schema
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Number of destination slots the projection fills
    pub fn projected_width(&self) -> usize {
        self.source_columns.len()
    }

    /// Project a raw row into a destination tuple
    pub fn project(&self, row: &Row) -> Result<ProjectedTuple> {
        let mut tuple = ProjectedTuple::empty(Arc::clone(&self.schema));
        for (dest, &src) in self.source_columns.iter().enumerate() {
            let value = row
                .get(src)
                .ok_or(Error::ColumnIndexOutOfBounds { index: src })?;
            tuple.set(dest, value.clone())?;
        }
        Ok(tuple)
    }
}

/// Merge one cached right-side row into a seed tuple
///
/// Copies the clause's present right columns into destination slots
/// starting at the clause's field position. The copy is all-or-nothing:
/// a malformed cache row (shorter than its present bitset claims)
/// fails with a decode-class error before the seed is touched. An
/// empty present bitset keeps the seed as-is.
pub fn merge_projected(
    seed: &ProjectedTuple,
    candidate: &Row,
    clause: &JoinClause,
) -> Result<ProjectedTuple> {
    if clause.present_bitset.is_empty() {
        return Ok(seed.clone());
    }
    let mut copies = Vec::with_capacity(clause.present_bitset.count());
    for right_slot in clause.present_bitset.iter_set() {
        let value = candidate.get(right_slot).ok_or_else(|| {
            Error::value_decode(format!(
                "cached row has {} columns, clause expects column {}",
                candidate.len(),
                right_slot
            ))
        })?;
        copies.push((clause.field_position + right_slot, value.clone()));
    }
    let mut merged = seed.clone();
    for (dest, value) in copies {
        merged.set(dest, value)?;
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use crate::core::{DataType, SchemaBuilder};
    use crate::executor::JoinType;

    use super::*;

    fn joined_schema() -> Arc<Schema> {
        Arc::new(
            SchemaBuilder::new("joined")
                .add("orders.id", DataType::Integer)
                .add("orders.total", DataType::Float)
                .add_nullable("items.order_id", DataType::Integer)
                .add_nullable("items.sku", DataType::Text)
                .build(),
        )
    }

    fn items_clause() -> JoinClause {
        JoinClause::new(
            JoinType::Inner,
            vec![1],
            vec![crate::expr::ExprNode::slot("id", 0)],
            Arc::new(
                SchemaBuilder::new("items")
                    .add("order_id", DataType::Integer)
                    .add("sku", DataType::Text)
                    .build(),
            ),
            2,
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_project_fills_raw_slots_only() {
        let projector = ScanProjector::new(joined_schema(), vec![0, 1]).unwrap();
        let raw = Row::from_values(vec![Value::integer(7), Value::float(9.5)]);
        let tuple = projector.project(&raw).unwrap();

        assert_eq!(tuple.read_column(0), Some(&Value::integer(7)));
        assert_eq!(tuple.read_column(1), Some(&Value::float(9.5)));
        assert_eq!(tuple.read_column(2), None, "join slot must be unset");
        assert_eq!(tuple.present_bitset().to_string(), "{0,1}");
    }

    #[test]
    fn test_project_reorders_columns() {
        let projector = ScanProjector::new(joined_schema(), vec![1, 0]).unwrap();
        let raw = Row::from_values(vec![Value::float(9.5), Value::integer(7)]);
        let tuple = projector.project(&raw).unwrap();
        assert_eq!(tuple.read_column(0), Some(&Value::integer(7)));
        assert_eq!(tuple.read_column(1), Some(&Value::float(9.5)));
    }

    #[test]
    fn test_projection_too_wide() {
        let schema = Arc::new(SchemaBuilder::new("s").add("a", DataType::Integer).build());
        assert_eq!(
            ScanProjector::new(schema, vec![0, 1]).unwrap_err(),
            Error::ProjectionTooWide {
                expected: 1,
                got: 2
            }
        );
    }

    #[test]
    fn test_project_short_row_fails() {
        let projector = ScanProjector::new(joined_schema(), vec![0, 1]).unwrap();
        let raw = Row::from_values(vec![Value::integer(7)]);
        assert_eq!(
            projector.project(&raw).unwrap_err(),
            Error::ColumnIndexOutOfBounds { index: 1 }
        );
    }

    #[test]
    fn test_merge_copies_right_columns() {
        let projector = ScanProjector::new(joined_schema(), vec![0, 1]).unwrap();
        let seed = projector
            .project(&Row::from_values(vec![Value::integer(7), Value::float(9.5)]))
            .unwrap();
        let candidate = Row::from_values(vec![Value::integer(7), Value::text("sku-1")]);

        let merged = merge_projected(&seed, &candidate, &items_clause()).unwrap();
        assert_eq!(merged.read_column(2), Some(&Value::integer(7)));
        assert_eq!(merged.read_column(3), Some(&Value::text("sku-1")));
        // Seed is untouched
        assert_eq!(seed.read_column(2), None);
    }

    #[test]
    fn test_merge_short_candidate_is_decode_error() {
        let seed = ProjectedTuple::empty(joined_schema());
        let candidate = Row::from_values(vec![Value::integer(7)]);
        let err = merge_projected(&seed, &candidate, &items_clause()).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_merge_empty_bitset_keeps_seed() {
        let projector = ScanProjector::new(joined_schema(), vec![0, 1]).unwrap();
        let seed = projector
            .project(&Row::from_values(vec![Value::integer(7), Value::float(9.5)]))
            .unwrap();
        let clause = items_clause().with_present_bitset(ValueBitSet::with_capacity(2));
        let candidate = Row::from_values(vec![Value::integer(7), Value::text("sku-1")]);

        let merged = merge_projected(&seed, &candidate, &clause).unwrap();
        assert_eq!(merged, seed);
    }

    #[test]
    fn test_into_row_nulls_unset_slots() {
        let projector = ScanProjector::new(joined_schema(), vec![0, 1]).unwrap();
        let tuple = projector
            .project(&Row::from_values(vec![Value::integer(7), Value::float(9.5)]))
            .unwrap();
        let row = tuple.into_row();
        assert_eq!(row.len(), 4);
        assert_eq!(row[0], Value::integer(7));
        assert_eq!(row[2], Value::Null);
        assert_eq!(row[3], Value::Null);
    }
}
