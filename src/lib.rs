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

//! # Kvexec - push-down execution core for SQL over key-value storage
//!
//! Kvexec is the server-side execution core of a distributed SQL-over-KV
//! engine. It runs at the data-partition boundary, where filter and join
//! work is cheaper than shipping raw rows to a client. The host process
//! owns parsing, planning, sessions and storage; kvexec owns three things:
//!
//! - **Predicate normalization** - rewriting comparison trees into
//!   canonical form (constants on the right, BETWEEN expanded, column
//!   references fully qualified) so later compiler stages see one shape.
//! - **Expression evaluation** - tagged-variant expression trees with
//!   three-valued logic (an explicit indeterminate outcome distinct from
//!   true/false) and enter/leave visitor dispatch for compile passes.
//! - **Hash-join execution** - streaming Inner/Left joins against
//!   pre-broadcast, read-only hash caches, with cross-expansion,
//!   post-join filtering and partial-failure recovery, all under a
//!   pull-based row interface.
//!
//! ## Modules
//!
//! - [`core`] - Core types ([`Value`], [`Row`], [`Schema`], [`Error`])
//! - [`expr`] - Expression trees, evaluation, visitors, the normalizer
//! - [`executor`] - Hash caches, projection and the join scanner

pub mod core;
pub mod executor;
pub mod expr;

// Re-export core types for convenience
pub use crate::core::{
    DataType, Error, Operator, Result, Row, Schema, SchemaBuilder, SchemaColumn, TupleRead, Value,
    ValueBitSet,
};

// Re-export expression types
pub use crate::expr::{
    bind_columns, collect_column_slots, normalize, walk, ColumnRef, ColumnResolver,
    ExpressionVisitor, ExprNode, Leave, LogicalOp, PredicateNormalizer, ResolvedColumn,
    StaticResolver, Traversal,
};

// Re-export executor types
pub use crate::executor::{
    HashCache, HashCacheRegistry, JoinClause, JoinExecutionScanner, JoinSpec, JoinType,
    MemoryCacheRegistry, MemoryHashCache, ProjectedTuple, RowSource, ScanProjector, VecRowSource,
};
