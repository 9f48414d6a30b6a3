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

//! Predicate normalization
//!
//! Rewrites predicate trees into canonical comparison form so later
//! compiler stages see one shape:
//!
//! - a comparison with exactly one stateless (constant-only) operand
//!   puts the non-constant operand on the left, inverting the operator
//!   so the truth value is preserved (`1 < a` becomes `a > 1`)
//! - `a BETWEEN b AND c` expands to `(b <= a) AND (a <= c)`, each leg
//!   normalized independently
//! - with more than one row source in the statement, an unqualified
//!   column whose alias equals its own name is rewritten to a fully
//!   qualified reference (case sensitivity preserved), so identically
//!   named columns across sources stay distinguishable
//!
//! Traversal is strict post-order: children are normalized before the
//! parent rule applies. Every column reference must resolve; an
//! unresolvable reference is an error, never silently dropped.

use rustc_hash::FxHashMap;

use crate::core::{DataType, Error, Operator, Result, Schema};

use super::node::{ColumnRef, ExprNode};
use super::visitor::{walk, ExpressionVisitor, Leave};

/// Resolution result for a column reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    /// Name of the row source defining the column
    pub source: String,

    /// Declared type of the column
    pub data_type: DataType,
}

/// Compile-time column resolution context
///
/// Supplied by the statement compiler; the normalizer uses it both to
/// validate every reference and to qualify self-aliased columns.
pub trait ColumnResolver {
    /// Resolve a column reference to its defining source, or `None` if
    /// the reference does not match any source
    fn resolve(&self, column: &ColumnRef) -> Option<ResolvedColumn>;
}

/// Resolver over a fixed set of named row sources
///
/// Lookup is case-insensitive on both source and column names. When a
/// reference is unqualified, sources are searched in declaration order
/// and the first match wins.
pub struct StaticResolver {
    sources: Vec<(String, Schema)>,
    by_name: FxHashMap<String, usize>,
}

impl StaticResolver {
    /// Create a resolver over `(source name, schema)` pairs
    pub fn new(sources: Vec<(String, Schema)>) -> Self {
        let by_name = sources
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.to_lowercase(), i))
            .collect();
        Self { sources, by_name }
    }

    /// Number of row sources in the context
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    fn resolve_in(&self, index: usize, column: &ColumnRef) -> Option<ResolvedColumn> {
        let (name, schema) = &self.sources[index];
        schema
            .get_column_by_name(&column.name)
            .map(|c| ResolvedColumn {
                source: name.clone(),
                data_type: c.data_type,
            })
    }
}

impl ColumnResolver for StaticResolver {
    fn resolve(&self, column: &ColumnRef) -> Option<ResolvedColumn> {
        match &column.source {
            Some(source) => {
                let index = *self.by_name.get(&source.to_lowercase())?;
                self.resolve_in(index, column)
            }
            None => (0..self.sources.len()).find_map(|i| self.resolve_in(i, column)),
        }
    }
}

/// The normalization pass
///
/// One instance of the generic rewrite machinery: comparison and
/// BETWEEN rules fire in `leave` (post-order), everything else
/// reassembles through the default combiner.
pub struct PredicateNormalizer<'a> {
    resolver: &'a dyn ColumnResolver,
    qualify_self_aliases: bool,
}

impl<'a> PredicateNormalizer<'a> {
    /// Create a normalizer
    ///
    /// `multiple_sources` is true when the statement joins more than
    /// one row source; only then are self-aliased columns qualified.
    pub fn new(resolver: &'a dyn ColumnResolver, multiple_sources: bool) -> Self {
        Self {
            resolver,
            qualify_self_aliases: multiple_sources,
        }
    }

    fn normalize_column(&self, column: &ColumnRef) -> Result<ColumnRef> {
        let resolved = self
            .resolver
            .resolve(column)
            .ok_or_else(|| Error::ColumnNotFound(column.full_name()))?;

        let self_aliased = match &column.alias {
            Some(alias) if column.case_sensitive => alias == &column.name,
            Some(alias) => alias.eq_ignore_ascii_case(&column.name),
            None => false,
        };
        if self.qualify_self_aliases && column.source.is_none() && self_aliased {
            let mut qualified = column.clone();
            qualified.source = Some(resolved.source);
            return Ok(qualified);
        }
        Ok(column.clone())
    }
}

/// Apply the comparison canonicalization rule to already-normalized
/// operands
fn normalize_comparison(op: Operator, left: ExprNode, right: ExprNode) -> ExprNode {
    if left.is_stateless() && !right.is_stateless() {
        ExprNode::comparison(op.invert(), right, left)
    } else {
        ExprNode::comparison(op, left, right)
    }
}

impl ExpressionVisitor for PredicateNormalizer<'_> {
    type Output = ExprNode;

    fn leave(&mut self, node: &ExprNode, mut children: Vec<ExprNode>) -> Result<Leave<ExprNode>> {
        match node {
            ExprNode::Comparison { op, .. } => {
                let right = children.pop().ok_or_else(|| {
                    Error::internal("comparison node missing right child")
                })?;
                let left = children.pop().ok_or_else(|| {
                    Error::internal("comparison node missing left child")
                })?;
                Ok(Leave::Value(normalize_comparison(*op, left, right)))
            }
            ExprNode::Between { .. } => {
                let high = children.pop().ok_or_else(|| {
                    Error::internal("between node missing high bound")
                })?;
                let low = children.pop().ok_or_else(|| {
                    Error::internal("between node missing low bound")
                })?;
                let expr = children.pop().ok_or_else(|| {
                    Error::internal("between node missing expression")
                })?;
                let lower = normalize_comparison(Operator::Lte, low, expr.clone());
                let upper = normalize_comparison(Operator::Lte, expr, high);
                Ok(Leave::Value(ExprNode::and_of(vec![lower, upper])))
            }
            ExprNode::Column(column) => Ok(Leave::Value(ExprNode::Column(
                self.normalize_column(column)?,
            ))),
            _ => Ok(Leave::Default(children)),
        }
    }

    fn default_output(&mut self, node: &ExprNode, children: Vec<ExprNode>) -> Result<ExprNode> {
        node.with_children(children)
    }
}

/// Normalize a predicate tree against a resolution context
///
/// Returns a new tree; the input is never mutated.
pub fn normalize(
    expr: &ExprNode,
    resolver: &dyn ColumnResolver,
    multiple_sources: bool,
) -> Result<ExprNode> {
    walk(expr, &mut PredicateNormalizer::new(resolver, multiple_sources))
}
