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

//! Streaming hash-join scanner
//!
//! [`JoinExecutionScanner`] wraps a partition [`RowSource`] and executes
//! a compiled [`JoinSpec`] under pull semantics: each `next` call pulls
//! input batches only until at least one joined tuple is queued, then
//! emits one tuple per call until the queue drains. Joins never buffer
//! the stream; memory is bounded by one input batch times the cross
//! expansion of its rows.
//!
//! Per-row rules:
//!
//! - probe keys evaluate against the growing tuple; an indeterminate or
//!   NULL key component matches nothing
//! - an INNER clause with no match drops the tuple, a LEFT clause keeps
//!   it with the right-side slots unset
//! - decode-class errors while keying, merging, or post-filtering drop
//!   only the offending tuple; the scan continues
//!
//! Configuration problems (unsupported join type, missing cache, clause
//! overflowing the joined schema) fail construction before any row is
//! pulled.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::Arc;

use crate::core::{Error, Result, Row, TupleRead, Value};
use crate::expr::ExprNode;

use super::cache::{HashCache, HashCacheRegistry};
use super::join::{JoinSpec, JoinType};
use super::projector::{merge_projected, ProjectedTuple, ScanProjector};

/// Pull interface over a stream of raw rows
///
/// `next_batch` appends zero or more rows to `out` and returns whether
/// more rows may follow. A scanner is itself a row source, so scan
/// stages compose.
pub trait RowSource: Send {
    /// Pull the next batch of rows
    fn next_batch(&mut self, out: &mut Vec<Row>) -> Result<bool>;

    /// Pull with an upper bound on rows wanted by the caller
    ///
    /// The bound is a hint; sources that cannot honor it fall back to a
    /// plain pull.
    fn next_batch_limited(&mut self, out: &mut Vec<Row>, _limit: usize) -> Result<bool> {
        self.next_batch(out)
    }

    /// Release the source's resources
    fn close(&mut self) -> Result<()>;
}

/// Row source over an in-memory vector, pulled in fixed-size batches
pub struct VecRowSource {
    rows: Vec<Row>,
    pos: usize,
    batch_size: usize,
    closed: bool,
}

impl VecRowSource {
    /// Create a source over the given rows
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            pos: 0,
            batch_size: 4,
            closed: false,
        }
    }

    /// Set the batch size (minimum 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Whether the source was closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RowSource for VecRowSource {
    fn next_batch(&mut self, out: &mut Vec<Row>) -> Result<bool> {
        let end = (self.pos + self.batch_size).min(self.rows.len());
        out.extend(self.rows[self.pos..end].iter().cloned());
        self.pos = end;
        Ok(self.pos < self.rows.len())
    }

    fn next_batch_limited(&mut self, out: &mut Vec<Row>, limit: usize) -> Result<bool> {
        let take = self.batch_size.min(limit.max(1));
        let end = (self.pos + take).min(self.rows.len());
        out.extend(self.rows[self.pos..end].iter().cloned());
        self.pos = end;
        Ok(self.pos < self.rows.len())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Join execution state resolved at construction
struct JoinState {
    spec: JoinSpec,
    /// One cache per clause, in clause order
    caches: Vec<Arc<dyn HashCache>>,
    /// Per-clause candidates of the current input row, for clauses
    /// probed in the early pass
    early: Vec<Option<Vec<Row>>>,
}

/// Scanner executing hash-join clauses over a partition row stream
pub struct JoinExecutionScanner {
    source: Box<dyn RowSource>,
    projector: ScanProjector,
    join: Option<JoinState>,
    /// Joined tuples awaiting emission
    queue: VecDeque<ProjectedTuple>,
    /// Reused input batch buffer
    batch: Vec<Row>,
    has_more: bool,
}

impl JoinExecutionScanner {
    /// Create a scanner, validating the join configuration
    ///
    /// Fails before any row is pulled when a clause uses a join type
    /// other than INNER or LEFT, when a clause's right side does not
    /// fit the joined schema, or when a clause's cache has not been
    /// broadcast to this partition.
    pub fn new(
        source: Box<dyn RowSource>,
        projector: ScanProjector,
        join_spec: Option<JoinSpec>,
        registry: &dyn HashCacheRegistry,
    ) -> Result<Self> {
        let join = match join_spec {
            Some(spec) => {
                let available = spec.joined_schema.column_count();
                let mut caches = Vec::with_capacity(spec.clauses.len());
                for (i, clause) in spec.clauses.iter().enumerate() {
                    match clause.join_type {
                        JoinType::Inner | JoinType::Left => {}
                        other => {
                            return Err(Error::unsupported_join_type(other.to_string()));
                        }
                    }
                    let right_width = clause.right_schema.column_count();
                    let required = clause.field_position + right_width;
                    if required > available {
                        return Err(Error::ClauseOutOfBounds {
                            clause: i,
                            required,
                            available,
                        });
                    }
                    // A stray present bit would address a right column
                    // that does not exist; reject it here so merge
                    // failures stay data-shaped
                    if let Some(bad) = clause
                        .present_bitset
                        .iter_set()
                        .find(|&slot| slot >= right_width)
                    {
                        return Err(Error::ColumnIndexOutOfBounds { index: bad });
                    }
                    caches.push(
                        registry
                            .get(&clause.join_id)
                            .ok_or_else(|| Error::hash_cache_missing(&clause.join_id))?,
                    );
                }
                let early = vec![None; spec.clauses.len()];
                Some(JoinState {
                    spec,
                    caches,
                    early,
                })
            }
            None => None,
        };
        Ok(Self {
            source,
            projector,
            join,
            queue: VecDeque::new(),
            batch: Vec::new(),
            has_more: true,
        })
    }

    /// Emit at most one joined row, returning whether more may follow
    ///
    /// Pulls input batches only while the emission queue is empty, so
    /// a satisfied consumer never costs more of the underlying scan.
    pub fn next(&mut self, out: &mut Vec<Row>) -> Result<bool> {
        while self.queue.is_empty() && self.has_more {
            self.pull_batch(None)?;
        }
        self.emit(out)
    }

    /// Emit at most one row under a consumer row limit
    ///
    /// Limits cannot be pushed below a join: a dropped or expanded
    /// tuple would make the source-side count wrong. With a join
    /// configured this fails without pulling any input.
    pub fn next_limited(&mut self, out: &mut Vec<Row>, limit: usize) -> Result<bool> {
        if self.join.is_some() {
            return Err(Error::not_supported("row limit with hash joins"));
        }
        while self.queue.is_empty() && self.has_more {
            self.pull_batch(Some(limit))?;
        }
        self.emit(out)
    }

    /// Release the underlying source and drop any queued tuples
    pub fn close(&mut self) -> Result<()> {
        self.queue.clear();
        self.has_more = false;
        self.source.close()
    }

    fn pull_batch(&mut self, limit: Option<usize>) -> Result<()> {
        let mut batch = mem::take(&mut self.batch);
        batch.clear();
        self.has_more = match limit {
            Some(limit) => self.source.next_batch_limited(&mut batch, limit)?,
            None => self.source.next_batch(&mut batch)?,
        };
        for row in &batch {
            self.process_row(row)?;
        }
        self.batch = batch;
        Ok(())
    }

    fn emit(&mut self, out: &mut Vec<Row>) -> Result<bool> {
        if let Some(tuple) = self.queue.pop_front() {
            out.push(tuple.into_row());
        }
        Ok(!self.queue.is_empty() || self.has_more)
    }

    /// Run one input row through every clause and queue the surviving
    /// tuples
    fn process_row(&mut self, row: &Row) -> Result<()> {
        let tuple = self.projector.project(row)?;
        let Some(join) = self.join.as_mut() else {
            self.queue.push_back(tuple);
            return Ok(());
        };

        // Early pass: clauses keyed on raw columns alone are probed
        // once per input row. An INNER clause with no match rejects the
        // row before any expansion work.
        for (i, clause) in join.spec.clauses.iter().enumerate() {
            if !clause.early_evaluation {
                join.early[i] = None;
                continue;
            }
            let candidates =
                match probe(join.caches[i].as_ref(), &clause.key_exprs, &tuple) {
                    Ok(rows) => rows,
                    Err(e) if e.is_decode() => return Ok(()),
                    Err(e) => return Err(e),
                };
            if candidates.is_empty() && clause.join_type == JoinType::Inner {
                return Ok(());
            }
            join.early[i] = Some(candidates);
        }

        // Expansion: each clause consumes the tuples the previous
        // clause produced and emits their cross product with its
        // matching cache rows.
        let mut local: VecDeque<ProjectedTuple> = VecDeque::with_capacity(1);
        local.push_back(tuple);
        for (i, clause) in join.spec.clauses.iter().enumerate() {
            let seeds = mem::take(&mut local);
            for seed in seeds {
                let candidates: Cow<'_, [Row]> = match &join.early[i] {
                    Some(rows) => Cow::Borrowed(rows.as_slice()),
                    None => match probe(join.caches[i].as_ref(), &clause.key_exprs, &seed)
                    {
                        Ok(rows) => Cow::Owned(rows),
                        // A seed that cannot be keyed matches nothing
                        // and is dropped; the scan continues
                        Err(e) if e.is_decode() => continue,
                        Err(e) => return Err(e),
                    },
                };
                if candidates.is_empty() {
                    if clause.join_type == JoinType::Left {
                        local.push_back(seed);
                    }
                    continue;
                }
                for candidate in candidates.iter() {
                    match merge_projected(&seed, candidate, clause) {
                        Ok(merged) => local.push_back(merged),
                        // Malformed cache row: skip this pairing only
                        Err(e) if e.is_decode() => {}
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        // Post-join filter: only a definite TRUE passes. NULL,
        // indeterminate, and decode-class errors exclude the tuple;
        // anything else (an unbound filter column, say) is a
        // configuration mistake and aborts the scan.
        if let Some(filter) = &join.spec.post_filter {
            let mut kept = VecDeque::with_capacity(local.len());
            for tuple in local {
                match filter.evaluate(&tuple) {
                    Ok(Some(Value::Boolean(true))) => kept.push_back(tuple),
                    Ok(_) => {}
                    Err(e) if e.is_decode() => {}
                    Err(e) => return Err(e),
                }
            }
            local = kept;
        }
        self.queue.extend(local);
        Ok(())
    }
}

// The wrapped source is a trait object, so Debug is spelled out by hand
impl fmt::Debug for JoinExecutionScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinExecutionScanner")
            .field(
                "join_clauses",
                &self.join.as_ref().map_or(0, |j| j.spec.clauses.len()),
            )
            .field("queued", &self.queue.len())
            .field("has_more", &self.has_more)
            .finish_non_exhaustive()
    }
}

impl RowSource for JoinExecutionScanner {
    fn next_batch(&mut self, out: &mut Vec<Row>) -> Result<bool> {
        self.next(out)
    }

    fn next_batch_limited(&mut self, out: &mut Vec<Row>, limit: usize) -> Result<bool> {
        self.next_limited(out, limit)
    }

    fn close(&mut self) -> Result<()> {
        JoinExecutionScanner::close(self)
    }
}

/// Probe a cache with the tuple's encoded key
///
/// An indeterminate or NULL key component makes the key unmatched by
/// construction, so the probe returns no candidates.
fn probe(
    cache: &dyn HashCache,
    key_exprs: &[ExprNode],
    tuple: &ProjectedTuple,
) -> Result<Vec<Row>> {
    match encode_probe_key(key_exprs, tuple)? {
        Some(key) => Ok(cache
            .get(&key)
            .map(|rows| rows.to_vec())
            .unwrap_or_default()),
        None => Ok(Vec::new()),
    }
}

/// Concatenate the self-delimiting encodings of the key expressions
///
/// Returns `None` when any component is indeterminate or NULL.
fn encode_probe_key(key_exprs: &[ExprNode], tuple: &dyn TupleRead) -> Result<Option<Vec<u8>>> {
    let mut key = Vec::new();
    for expr in key_exprs {
        match expr.evaluate(tuple)? {
            None | Some(Value::Null) => return Ok(None),
            Some(value) => value.encode_into(&mut key),
        }
    }
    Ok(Some(key))
}

#[cfg(test)]
mod tests {
    use crate::core::{DataType, SchemaBuilder};
    use crate::executor::MemoryCacheRegistry;

    use super::*;

    fn drain(scanner: &mut JoinExecutionScanner) -> Vec<Row> {
        let mut out = Vec::new();
        while scanner.next(&mut out).unwrap() {}
        out
    }

    fn users_schema() -> Arc<crate::core::Schema> {
        Arc::new(
            SchemaBuilder::new("users")
                .add("id", DataType::Integer)
                .add("name", DataType::Text)
                .build(),
        )
    }

    #[test]
    fn test_vec_source_batches() {
        let rows: Vec<Row> = (0..5)
            .map(|i| Row::from_values(vec![Value::integer(i)]))
            .collect();
        let mut source = VecRowSource::new(rows).with_batch_size(2);

        let mut out = Vec::new();
        assert!(source.next_batch(&mut out).unwrap());
        assert_eq!(out.len(), 2);
        assert!(source.next_batch(&mut out).unwrap());
        assert_eq!(out.len(), 4);
        assert!(!source.next_batch(&mut out).unwrap());
        assert_eq!(out.len(), 5);

        assert!(!source.is_closed());
        source.close().unwrap();
        assert!(source.is_closed());
    }

    #[test]
    fn test_vec_source_limited_pull() {
        let rows: Vec<Row> = (0..5)
            .map(|i| Row::from_values(vec![Value::integer(i)]))
            .collect();
        let mut source = VecRowSource::new(rows).with_batch_size(4);

        let mut out = Vec::new();
        assert!(source.next_batch_limited(&mut out, 1).unwrap());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_projection_only_passthrough() {
        let rows = vec![
            Row::from_values(vec![Value::integer(1), Value::text("ann")]),
            Row::from_values(vec![Value::integer(2), Value::text("bob")]),
        ];
        let registry = MemoryCacheRegistry::new();
        let mut scanner = JoinExecutionScanner::new(
            Box::new(VecRowSource::new(rows.clone())),
            ScanProjector::identity(users_schema()),
            None,
            &registry,
        )
        .unwrap();

        assert_eq!(drain(&mut scanner), rows);
    }

    #[test]
    fn test_projection_reorders() {
        let rows = vec![Row::from_values(vec![Value::integer(1), Value::text("ann")])];
        let schema = Arc::new(
            SchemaBuilder::new("users")
                .add("name", DataType::Text)
                .add("id", DataType::Integer)
                .build(),
        );
        let registry = MemoryCacheRegistry::new();
        let mut scanner = JoinExecutionScanner::new(
            Box::new(VecRowSource::new(rows)),
            ScanProjector::new(schema, vec![1, 0]).unwrap(),
            None,
            &registry,
        )
        .unwrap();

        let out = drain(&mut scanner);
        assert_eq!(
            out,
            vec![Row::from_values(vec![Value::text("ann"), Value::integer(1)])]
        );
    }

    #[test]
    fn test_empty_source() {
        let registry = MemoryCacheRegistry::new();
        let mut scanner = JoinExecutionScanner::new(
            Box::new(VecRowSource::new(Vec::new())),
            ScanProjector::identity(users_schema()),
            None,
            &registry,
        )
        .unwrap();

        let mut out = Vec::new();
        assert!(!scanner.next(&mut out).unwrap());
        assert!(out.is_empty());
    }

    #[test]
    fn test_probe_key_concatenates_components() {
        let tuple = {
            let mut t = ProjectedTuple::empty(users_schema());
            t.set(0, Value::integer(7)).unwrap();
            t.set(1, Value::text("x")).unwrap();
            t
        };
        let exprs = vec![ExprNode::slot("id", 0), ExprNode::slot("name", 1)];
        let key = encode_probe_key(&exprs, &tuple).unwrap().unwrap();

        let mut expected = Value::integer(7).encode();
        expected.extend(Value::text("x").encode());
        assert_eq!(key, expected);
    }

    #[test]
    fn test_probe_key_null_and_indeterminate() {
        let mut tuple = ProjectedTuple::empty(users_schema());
        tuple.set(0, Value::Null).unwrap();
        // Slot 1 stays unset

        let null_key = encode_probe_key(&[ExprNode::slot("id", 0)], &tuple).unwrap();
        assert_eq!(null_key, None);

        let absent_key = encode_probe_key(&[ExprNode::slot("name", 1)], &tuple).unwrap();
        assert_eq!(absent_key, None);
    }

    #[test]
    fn test_scanner_debug_format() {
        let registry = MemoryCacheRegistry::new();
        let scanner = JoinExecutionScanner::new(
            Box::new(VecRowSource::new(Vec::new())),
            ScanProjector::identity(users_schema()),
            None,
            &registry,
        )
        .unwrap();

        let rendered = format!("{scanner:?}");
        assert!(rendered.contains("JoinExecutionScanner"));
        assert!(rendered.contains("queued: 0"));
    }

    #[test]
    fn test_close_stops_emission() {
        let rows = vec![Row::from_values(vec![Value::integer(1), Value::text("a")])];
        let registry = MemoryCacheRegistry::new();
        let mut scanner = JoinExecutionScanner::new(
            Box::new(VecRowSource::new(rows)),
            ScanProjector::identity(users_schema()),
            None,
            &registry,
        )
        .unwrap();

        scanner.close().unwrap();
        let mut out = Vec::new();
        assert!(!scanner.next(&mut out).unwrap());
        assert!(out.is_empty());
    }
}
