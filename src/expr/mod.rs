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

//! Expression system for kvexec
//!
//! This module provides the tagged-variant expression tree used for join
//! keys and filters, its three-valued evaluator, the enter/leave visitor
//! machinery shared by compile passes, and the predicate normalizer.
//!
//! # Parts
//!
//! - [`ExprNode`] - immutable expression tree (comparisons, BETWEEN,
//!   AND/OR composites, column references, literals)
//! - [`ExprNode::evaluate`] - three-valued evaluation over any
//!   [`TupleRead`](crate::core::TupleRead) row
//! - [`ExpressionVisitor`] / [`walk`] - enter/leave double dispatch with
//!   a default combiner, so the same node types support independent
//!   passes without per-pass subclassing
//! - [`PredicateNormalizer`] / [`normalize`] - canonical comparison form

pub mod eval;
pub mod node;
pub mod normalizer;
pub mod visitor;

pub use node::{ColumnRef, ExprNode, LogicalOp};
pub use normalizer::{normalize, ColumnResolver, PredicateNormalizer, ResolvedColumn, StaticResolver};
pub use visitor::{bind_columns, collect_column_slots, walk, ExpressionVisitor, Leave, Traversal};
