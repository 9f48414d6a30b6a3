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

//! Expression tree nodes
//!
//! [`ExprNode`] is an immutable tagged-variant tree with ordered
//! children. Rewrite passes never mutate a tree in place; they build a
//! new one through [`ExprNode::with_children`].

use std::fmt;

use crate::core::{Error, Operator, Result, Value};

/// Logical composite operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// Conjunction - stops on the first definite FALSE
    And,
    /// Disjunction - stops on the first definite TRUE
    Or,
}

impl LogicalOp {
    /// The child value that short-circuits evaluation of the composite
    pub fn stop_value(self) -> bool {
        matches!(self, LogicalOp::Or)
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "AND"),
            LogicalOp::Or => write!(f, "OR"),
        }
    }
}

/// A column reference
///
/// Compile-time passes carry the textual identity (source qualifier,
/// name, alias, case sensitivity); binding against a schema fills the
/// slot index used at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Qualifying row-source name (`orders` in `orders.id`), if any
    pub source: Option<String>,

    /// Column name
    pub name: String,

    /// Alias the column is known by in the statement, if any
    pub alias: Option<String>,

    /// Whether the reference was quoted (case must be preserved)
    pub case_sensitive: bool,

    /// Slot index in the bound schema; `None` until bound
    pub slot: Option<usize>,
}

impl ColumnRef {
    /// Create an unqualified, unbound column reference
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            source: None,
            name: name.into(),
            alias: None,
            case_sensitive: false,
            slot: None,
        }
    }

    /// Create a qualified column reference (`source.name`)
    pub fn qualified(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            name: name.into(),
            alias: None,
            case_sensitive: false,
            slot: None,
        }
    }

    /// Set the alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Mark the reference as quoted / case-sensitive
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    /// Set the bound slot index
    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Fully qualified display name
    pub fn full_name(&self) -> String {
        match &self.source {
            Some(source) => format!("{source}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.case_sensitive {
            match &self.source {
                Some(source) => write!(f, "{source}.\"{}\"", self.name),
                None => write!(f, "\"{}\"", self.name),
            }
        } else {
            f.write_str(&self.full_name())
        }
    }
}

/// An immutable expression tree node
///
/// Children are ordered; every rewrite produces a new tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    /// Constant value
    Literal(Value),

    /// Column reference
    Column(ColumnRef),

    /// Binary comparison
    Comparison {
        op: Operator,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },

    /// Range check: `low <= expr AND expr <= high`
    Between {
        expr: Box<ExprNode>,
        low: Box<ExprNode>,
        high: Box<ExprNode>,
    },

    /// AND/OR composite over two or more children
    Logical {
        op: LogicalOp,
        children: Vec<ExprNode>,
    },

    /// Negation
    Not(Box<ExprNode>),
}

impl ExprNode {
    /// Create a literal node
    pub fn literal(value: Value) -> Self {
        ExprNode::Literal(value)
    }

    /// Create an unbound column node
    pub fn column(name: impl Into<String>) -> Self {
        ExprNode::Column(ColumnRef::new(name))
    }

    /// Create a column node bound to a slot (for runtime-only trees)
    pub fn slot(name: impl Into<String>, slot: usize) -> Self {
        ExprNode::Column(ColumnRef::new(name).with_slot(slot))
    }

    /// Create a comparison node
    pub fn comparison(op: Operator, left: ExprNode, right: ExprNode) -> Self {
        ExprNode::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a BETWEEN node
    pub fn between(expr: ExprNode, low: ExprNode, high: ExprNode) -> Self {
        ExprNode::Between {
            expr: Box::new(expr),
            low: Box::new(low),
            high: Box::new(high),
        }
    }

    /// Create an AND composite
    pub fn and_of(children: Vec<ExprNode>) -> Self {
        ExprNode::Logical {
            op: LogicalOp::And,
            children,
        }
    }

    /// Create an OR composite
    pub fn or_of(children: Vec<ExprNode>) -> Self {
        ExprNode::Logical {
            op: LogicalOp::Or,
            children,
        }
    }

    /// Create a NOT node
    pub fn not(inner: ExprNode) -> Self {
        ExprNode::Not(Box::new(inner))
    }

    /// Check whether this subtree is constant-only (no column reference)
    ///
    /// Stateless subtrees are foldable to a constant; the normalizer
    /// moves them to the right-hand side of comparisons.
    pub fn is_stateless(&self) -> bool {
        match self {
            ExprNode::Literal(_) => true,
            ExprNode::Column(_) => false,
            _ => self.children().iter().all(|c| c.is_stateless()),
        }
    }

    /// Ordered child nodes
    pub fn children(&self) -> Vec<&ExprNode> {
        match self {
            ExprNode::Literal(_) | ExprNode::Column(_) => Vec::new(),
            ExprNode::Comparison { left, right, .. } => vec![left, right],
            ExprNode::Between { expr, low, high } => vec![expr, low, high],
            ExprNode::Logical { children, .. } => children.iter().collect(),
            ExprNode::Not(inner) => vec![inner],
        }
    }

    /// Rebuild this node with new children, preserving the variant
    ///
    /// This is the default combiner of rewrite passes: a pass that has
    /// no rule for a node reassembles it around the rewritten children.
    /// Fails if the child count does not match the variant's arity.
    pub fn with_children(&self, mut children: Vec<ExprNode>) -> Result<ExprNode> {
        let arity_error = |expected: usize, got: usize| {
            Error::internal(format!(
                "expression rebuild arity mismatch: expected {expected} children, got {got}"
            ))
        };
        match self {
            ExprNode::Literal(_) | ExprNode::Column(_) => {
                if !children.is_empty() {
                    return Err(arity_error(0, children.len()));
                }
                Ok(self.clone())
            }
            ExprNode::Comparison { op, .. } => {
                if children.len() != 2 {
                    return Err(arity_error(2, children.len()));
                }
                let right = children.pop().expect("two children");
                let left = children.pop().expect("two children");
                Ok(ExprNode::comparison(*op, left, right))
            }
            ExprNode::Between { .. } => {
                if children.len() != 3 {
                    return Err(arity_error(3, children.len()));
                }
                let high = children.pop().expect("three children");
                let low = children.pop().expect("three children");
                let expr = children.pop().expect("three children");
                Ok(ExprNode::between(expr, low, high))
            }
            ExprNode::Logical { op, children: old } => {
                if children.len() != old.len() {
                    return Err(arity_error(old.len(), children.len()));
                }
                Ok(ExprNode::Logical {
                    op: *op,
                    children,
                })
            }
            ExprNode::Not(_) => {
                if children.len() != 1 {
                    return Err(arity_error(1, children.len()));
                }
                Ok(ExprNode::not(children.pop().expect("one child")))
            }
        }
    }
}

impl fmt::Display for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprNode::Literal(v) => write!(f, "{v}"),
            ExprNode::Column(c) => write!(f, "{c}"),
            ExprNode::Comparison { op, left, right } => write!(f, "({left} {op} {right})"),
            ExprNode::Between { expr, low, high } => {
                write!(f, "({expr} BETWEEN {low} AND {high})")
            }
            ExprNode::Logical { op, children } => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {op} ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            ExprNode::Not(inner) => write!(f, "NOT {inner}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_stateless() {
        let constant = ExprNode::comparison(
            Operator::Lt,
            ExprNode::literal(Value::integer(1)),
            ExprNode::literal(Value::integer(2)),
        );
        assert!(constant.is_stateless());

        let with_column = ExprNode::comparison(
            Operator::Lt,
            ExprNode::column("age"),
            ExprNode::literal(Value::integer(2)),
        );
        assert!(!with_column.is_stateless());

        assert!(ExprNode::literal(Value::Null).is_stateless());
        assert!(!ExprNode::column("x").is_stateless());
    }

    #[test]
    fn test_with_children_preserves_variant() {
        let cmp = ExprNode::comparison(
            Operator::Gte,
            ExprNode::column("a"),
            ExprNode::literal(Value::integer(5)),
        );
        let rebuilt = cmp
            .with_children(vec![
                ExprNode::column("b"),
                ExprNode::literal(Value::integer(6)),
            ])
            .unwrap();
        match rebuilt {
            ExprNode::Comparison { op, left, right } => {
                assert_eq!(op, Operator::Gte);
                assert_eq!(*left, ExprNode::column("b"));
                assert_eq!(*right, ExprNode::literal(Value::integer(6)));
            }
            other => panic!("unexpected rebuild: {other}"),
        }
    }

    #[test]
    fn test_with_children_arity_check() {
        let cmp = ExprNode::comparison(
            Operator::Eq,
            ExprNode::column("a"),
            ExprNode::column("b"),
        );
        assert!(cmp.with_children(vec![ExprNode::column("a")]).is_err());

        let leaf = ExprNode::literal(Value::integer(1));
        assert!(leaf.with_children(vec![ExprNode::column("x")]).is_err());
        assert_eq!(leaf.with_children(Vec::new()).unwrap(), leaf);
    }

    #[test]
    fn test_display() {
        let expr = ExprNode::and_of(vec![
            ExprNode::comparison(
                Operator::Lte,
                ExprNode::literal(Value::integer(1)),
                ExprNode::column("a"),
            ),
            ExprNode::not(ExprNode::column("deleted")),
        ]);
        assert_eq!(expr.to_string(), "((1 <= a) AND NOT deleted)");

        let quoted = ColumnRef::qualified("t", "Name").case_sensitive();
        assert_eq!(quoted.to_string(), "t.\"Name\"");
    }
}
