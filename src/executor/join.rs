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

//! Join specification types
//!
//! A [`JoinSpec`] is the compiled description of a multi-way hash join
//! against one partition scan: an ordered list of [`JoinClause`]s, the
//! joined destination schema, and an optional post-join filter. The
//! scanner executes clauses in order, expanding each tuple against the
//! pre-broadcast cache of the clause's right side.

use std::fmt;
use std::sync::Arc;

use crate::core::{Result, Schema, ValueBitSet};
use crate::expr::{collect_column_slots, ExprNode};

/// Join type of a single clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Left => write!(f, "LEFT"),
            JoinType::Right => write!(f, "RIGHT"),
            JoinType::Full => write!(f, "FULL"),
        }
    }
}

/// One hash-join clause against a broadcast cache
///
/// `key_exprs` are bound against the joined destination schema; their
/// encoded values concatenate into the probe key. `field_position` is
/// the destination slot where the clause's right-side columns land, and
/// `present_bitset` (in right-schema coordinates) selects which of them
/// are copied on a match.
#[derive(Debug, Clone)]
pub struct JoinClause {
    /// Join type; only INNER and LEFT execute
    pub join_type: JoinType,

    /// Identifier of the broadcast hash cache holding the right side
    pub join_id: Vec<u8>,

    /// Bound probe-key expressions, evaluated against the growing tuple
    pub key_exprs: Vec<ExprNode>,

    /// Schema of the cached right-side rows
    pub right_schema: Arc<Schema>,

    /// Right-schema slots copied into the tuple on a match
    pub present_bitset: ValueBitSet,

    /// First destination slot of the clause's right-side columns
    pub field_position: usize,

    /// Whether the probe keys read only raw projected columns, so the
    /// clause can be probed once per input row before any expansion
    pub early_evaluation: bool,
}

impl JoinClause {
    /// Create a clause, deriving the early-evaluation flag
    ///
    /// `raw_slot_limit` is the number of destination slots the
    /// partition projection fills; a clause whose key expressions read
    /// only those slots is probed before any per-clause expansion.
    /// All right-schema columns are marked present; narrow the copy
    /// with [`with_present_bitset`](Self::with_present_bitset).
    pub fn new(
        join_type: JoinType,
        join_id: Vec<u8>,
        key_exprs: Vec<ExprNode>,
        right_schema: Arc<Schema>,
        field_position: usize,
        raw_slot_limit: usize,
    ) -> Result<Self> {
        let mut early_evaluation = true;
        for expr in &key_exprs {
            if collect_column_slots(expr)?
                .iter()
                .any(|&slot| slot >= raw_slot_limit)
            {
                early_evaluation = false;
                break;
            }
        }
        let width = right_schema.column_count();
        let slots: Vec<usize> = (0..width).collect();
        Ok(Self {
            join_type,
            join_id,
            key_exprs,
            right_schema,
            present_bitset: ValueBitSet::from_slots(width, &slots),
            field_position,
            early_evaluation,
        })
    }

    /// Replace the present bitset (right-schema coordinates)
    ///
    /// Set bits must address columns of the right schema; the scanner
    /// rejects stray bits at construction.
    pub fn with_present_bitset(mut self, present_bitset: ValueBitSet) -> Self {
        self.present_bitset = present_bitset;
        self
    }
}

/// Compiled join description for one partition scan
#[derive(Debug, Clone)]
pub struct JoinSpec {
    /// Clauses in execution order
    pub clauses: Vec<JoinClause>,

    /// Destination schema of fully joined tuples
    pub joined_schema: Arc<Schema>,

    /// Filter applied to joined tuples before they are emitted
    pub post_filter: Option<ExprNode>,
}

impl JoinSpec {
    /// Create a spec with no post-join filter
    pub fn new(clauses: Vec<JoinClause>, joined_schema: Arc<Schema>) -> Self {
        Self {
            clauses,
            joined_schema,
            post_filter: None,
        }
    }

    /// Attach a post-join filter (bound against the joined schema)
    pub fn with_post_filter(mut self, filter: ExprNode) -> Self {
        self.post_filter = Some(filter);
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{DataType, SchemaBuilder};

    use super::*;

    fn right_schema() -> Arc<Schema> {
        Arc::new(
            SchemaBuilder::new("items")
                .add("order_id", DataType::Integer)
                .add("sku", DataType::Text)
                .build(),
        )
    }

    #[test]
    fn test_join_type_display() {
        assert_eq!(JoinType::Inner.to_string(), "INNER");
        assert_eq!(JoinType::Full.to_string(), "FULL");
    }

    #[test]
    fn test_clause_early_when_keys_read_raw_slots() {
        let clause = JoinClause::new(
            JoinType::Inner,
            vec![1],
            vec![ExprNode::slot("id", 0)],
            right_schema(),
            2,
            2,
        )
        .unwrap();
        assert!(clause.early_evaluation);
        assert_eq!(clause.present_bitset.iter_set().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_clause_late_when_keys_read_joined_output() {
        // Key reads slot 3, produced by an earlier clause (raw limit 2)
        let clause = JoinClause::new(
            JoinType::Left,
            vec![2],
            vec![ExprNode::slot("id", 0), ExprNode::slot("sku", 3)],
            right_schema(),
            4,
            2,
        )
        .unwrap();
        assert!(!clause.early_evaluation);
    }

    #[test]
    fn test_clause_unbound_key_fails() {
        let result = JoinClause::new(
            JoinType::Inner,
            vec![3],
            vec![ExprNode::column("unbound")],
            right_schema(),
            2,
            2,
        );
        assert!(result.is_err());
    }
}
