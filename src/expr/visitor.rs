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

//! Enter/leave visitor dispatch over expression trees
//!
//! A single generic [`walk`] driver runs any [`ExpressionVisitor`]:
//! `enter` is called on the way down and may skip a subtree, each child
//! is visited producing a result, and `leave` combines the child results
//! into the node's result. A `leave` that declines (returns
//! [`Leave::Default`]) hands the children back to `default_output`, the
//! pass's generic combiner. The same node types thus support multiple
//! independent passes - normalization, slot binding, column analysis -
//! without per-pass node subclassing.

use crate::core::{Error, Result, Schema};

use super::node::ExprNode;

/// Decision returned by `enter` for a node's subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Visit the node's children
    Descend,
    /// Do not visit children; `leave` receives no child results
    Skip,
}

/// Outcome of a `leave` step
pub enum Leave<T> {
    /// The pass produced an explicit result for this node
    Value(T),
    /// The pass has no rule here; the default combiner takes the
    /// child results
    Default(Vec<T>),
}

/// A pass over an expression tree
pub trait ExpressionVisitor {
    /// Result type produced per node
    type Output;

    /// Called before a node's children are visited
    fn enter(&mut self, _node: &ExprNode) -> Result<Traversal> {
        Ok(Traversal::Descend)
    }

    /// Called after a node's children were visited, with their results
    /// in child order
    fn leave(&mut self, node: &ExprNode, children: Vec<Self::Output>) -> Result<Leave<Self::Output>>;

    /// Generic combiner used when `leave` declines
    fn default_output(
        &mut self,
        node: &ExprNode,
        children: Vec<Self::Output>,
    ) -> Result<Self::Output>;
}

/// Run a visitor over a tree, bottom-up
pub fn walk<V: ExpressionVisitor>(node: &ExprNode, visitor: &mut V) -> Result<V::Output> {
    let children = match visitor.enter(node)? {
        Traversal::Descend => {
            let child_nodes = node.children();
            let mut results = Vec::with_capacity(child_nodes.len());
            for child in child_nodes {
                results.push(walk(child, visitor)?);
            }
            results
        }
        Traversal::Skip => Vec::new(),
    };
    match visitor.leave(node, children)? {
        Leave::Value(value) => Ok(value),
        Leave::Default(children) => visitor.default_output(node, children),
    }
}

/// Rewrite pass binding column references to schema slots
///
/// Qualified references try `source.name` against the schema first and
/// fall back to the bare name, so a joined destination schema may carry
/// either naming convention.
struct SlotBinder<'a> {
    schema: &'a Schema,
}

impl ExpressionVisitor for SlotBinder<'_> {
    type Output = ExprNode;

    fn leave(&mut self, node: &ExprNode, children: Vec<ExprNode>) -> Result<Leave<ExprNode>> {
        if let ExprNode::Column(column) = node {
            let slot = self
                .schema
                .get_column_index(&column.full_name())
                .or_else(|| self.schema.get_column_index(&column.name))
                .ok_or_else(|| Error::ColumnNotFound(column.full_name()))?;
            return Ok(Leave::Value(ExprNode::Column(
                column.clone().with_slot(slot),
            )));
        }
        Ok(Leave::Default(children))
    }

    fn default_output(&mut self, node: &ExprNode, children: Vec<ExprNode>) -> Result<ExprNode> {
        node.with_children(children)
    }
}

/// Return a copy of `expr` with every column reference bound to its
/// slot in `schema`
///
/// Fails with a resolution error for any column the schema does not
/// contain.
pub fn bind_columns(expr: &ExprNode, schema: &Schema) -> Result<ExprNode> {
    walk(expr, &mut SlotBinder { schema })
}

/// Analysis pass recording the slot of every bound column reference
struct ColumnSlotCollector {
    slots: Vec<usize>,
}

impl ExpressionVisitor for ColumnSlotCollector {
    type Output = ();

    fn enter(&mut self, node: &ExprNode) -> Result<Traversal> {
        if let ExprNode::Column(column) = node {
            let slot = column
                .slot
                .ok_or_else(|| Error::ColumnNotFound(column.full_name()))?;
            self.slots.push(slot);
        }
        Ok(Traversal::Descend)
    }

    fn leave(&mut self, _node: &ExprNode, children: Vec<()>) -> Result<Leave<()>> {
        Ok(Leave::Default(children))
    }

    fn default_output(&mut self, _node: &ExprNode, _children: Vec<()>) -> Result<()> {
        Ok(())
    }
}

/// Collect the slots of all column references in a bound expression
///
/// Used to decide whether a join-key expression reads only raw input
/// columns (early evaluation) or depends on previously joined output.
pub fn collect_column_slots(expr: &ExprNode) -> Result<Vec<usize>> {
    let mut collector = ColumnSlotCollector { slots: Vec::new() };
    walk(expr, &mut collector)?;
    Ok(collector.slots)
}

#[cfg(test)]
mod tests {
    use crate::core::{DataType, Operator, SchemaBuilder, Value};

    use super::*;

    fn sample_expr() -> ExprNode {
        ExprNode::and_of(vec![
            ExprNode::comparison(
                Operator::Gt,
                ExprNode::column("age"),
                ExprNode::literal(Value::integer(21)),
            ),
            ExprNode::comparison(
                Operator::Eq,
                ExprNode::column("name"),
                ExprNode::literal(Value::text("bob")),
            ),
        ])
    }

    #[test]
    fn test_bind_columns() {
        let schema = SchemaBuilder::new("users")
            .add("name", DataType::Text)
            .add("age", DataType::Integer)
            .build();

        let bound = bind_columns(&sample_expr(), &schema).unwrap();
        assert_eq!(collect_column_slots(&bound).unwrap(), vec![1, 0]);
        // Binding returns a new tree; the input stays unbound
        assert!(collect_column_slots(&sample_expr()).is_err());
    }

    #[test]
    fn test_bind_unknown_column_fails() {
        let schema = SchemaBuilder::new("users")
            .add("name", DataType::Text)
            .build();
        assert_eq!(
            bind_columns(&sample_expr(), &schema),
            Err(Error::ColumnNotFound("age".to_string()))
        );
    }

    #[test]
    fn test_bind_qualified_reference() {
        // Joined destination schemas may name slots with their source prefix
        let schema = SchemaBuilder::new("joined")
            .add("orders.id", DataType::Integer)
            .add("items.id", DataType::Integer)
            .build();

        let expr = ExprNode::Column(crate::expr::ColumnRef::qualified("items", "id"));
        let bound = bind_columns(&expr, &schema).unwrap();
        assert_eq!(collect_column_slots(&bound).unwrap(), vec![1]);
    }

    #[test]
    fn test_skip_subtree() {
        // A visitor that counts nodes but skips AND subtrees entirely
        struct NodeCounter {
            visited: usize,
        }
        impl ExpressionVisitor for NodeCounter {
            type Output = ();
            fn enter(&mut self, node: &ExprNode) -> Result<Traversal> {
                self.visited += 1;
                match node {
                    ExprNode::Logical { .. } => Ok(Traversal::Skip),
                    _ => Ok(Traversal::Descend),
                }
            }
            fn leave(&mut self, _node: &ExprNode, children: Vec<()>) -> Result<Leave<()>> {
                Ok(Leave::Default(children))
            }
            fn default_output(&mut self, _node: &ExprNode, _children: Vec<()>) -> Result<()> {
                Ok(())
            }
        }

        let mut counter = NodeCounter { visited: 0 };
        walk(&sample_expr(), &mut counter).unwrap();
        assert_eq!(counter.visited, 1);
    }
}
