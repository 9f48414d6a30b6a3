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

//! Partition-side join execution
//!
//! This module holds the runtime half of kvexec: broadcast hash caches
//! and their registry, projection of raw rows into the joined
//! destination schema, and the streaming scanner that executes compiled
//! join specs under pull semantics.

pub mod cache;
pub mod join;
pub mod projector;
pub mod scanner;

pub use cache::{HashCache, HashCacheRegistry, MemoryCacheRegistry, MemoryHashCache};
pub use join::{JoinClause, JoinSpec, JoinType};
pub use projector::{merge_projected, ProjectedTuple, ScanProjector};
pub use scanner::{JoinExecutionScanner, RowSource, VecRowSource};
