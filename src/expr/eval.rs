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

//! Three-valued expression evaluation
//!
//! Evaluation returns `Result<Option<Value>>`:
//!
//! - `Ok(Some(v))` - a definite value was produced
//! - `Ok(None)` - indeterminate: no value is available (an unset slot in
//!   a partially joined tuple). This is distinct from a definite SQL
//!   NULL, which is `Ok(Some(Value::Null))`, and distinct from `false`.
//! - `Err(_)` - evaluation failed (decode error, incomparable types)
//!
//! AND/OR composites short-circuit on the first *definite* stop value
//! (`false` for AND, `true` for OR). Without a stop value the children
//! fold: any indeterminate child makes the composite indeterminate, any
//! NULL makes it NULL, and only an all-definite, all-non-stop run of
//! children yields the complement of the stop value.

use crate::core::{Error, Operator, Result, TupleRead, Value};

use super::node::{ExprNode, LogicalOp};

impl ExprNode {
    /// Evaluate this expression against a row
    ///
    /// Column nodes must be bound to slots first (see
    /// [`bind_columns`](super::visitor::bind_columns)); evaluating an
    /// unbound column fails.
    pub fn evaluate(&self, row: &dyn TupleRead) -> Result<Option<Value>> {
        match self {
            ExprNode::Literal(value) => Ok(Some(value.clone())),
            ExprNode::Column(column) => {
                let slot = column
                    .slot
                    .ok_or_else(|| Error::ColumnNotFound(column.full_name()))?;
                // An unset slot yields no value yet, not NULL
                Ok(row.read_column(slot).cloned())
            }
            ExprNode::Comparison { op, left, right } => {
                let Some(lhs) = left.evaluate(row)? else {
                    return Ok(None);
                };
                let Some(rhs) = right.evaluate(row)? else {
                    return Ok(None);
                };
                compare_values(*op, &lhs, &rhs)
            }
            ExprNode::Between { expr, low, high } => {
                let Some(value) = expr.evaluate(row)? else {
                    return Ok(None);
                };
                let Some(lo) = low.evaluate(row)? else {
                    return Ok(None);
                };
                let Some(hi) = high.evaluate(row)? else {
                    return Ok(None);
                };
                let lower = compare_values(Operator::Lte, &lo, &value)?;
                if lower == Some(Value::Boolean(false)) {
                    return Ok(lower);
                }
                let upper = compare_values(Operator::Lte, &value, &hi)?;
                combine_definite_and(lower, upper)
            }
            ExprNode::Logical { op, children } => evaluate_composite(*op, children, row),
            ExprNode::Not(inner) => match inner.evaluate(row)? {
                None => Ok(None),
                Some(Value::Null) => Ok(Some(Value::Null)),
                Some(value) => Ok(Some(Value::Boolean(!value.to_boolean()?))),
            },
        }
    }
}

/// Compare two definite values under SQL semantics
///
/// NULL on either side yields a definite NULL; incomparable types are an
/// evaluation error (recovered by the caller as a dropped tuple).
fn compare_values(op: Operator, lhs: &Value, rhs: &Value) -> Result<Option<Value>> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Some(Value::Null));
    }
    let ordering = lhs.compare(rhs)?;
    Ok(Some(Value::Boolean(op.matches(ordering))))
}

/// AND of two already-evaluated comparison legs (for BETWEEN)
fn combine_definite_and(a: Option<Value>, b: Option<Value>) -> Result<Option<Value>> {
    match (a, b) {
        (Some(Value::Boolean(false)), _) | (_, Some(Value::Boolean(false))) => {
            Ok(Some(Value::Boolean(false)))
        }
        (Some(Value::Null), _) | (_, Some(Value::Null)) => Ok(Some(Value::Null)),
        (Some(Value::Boolean(true)), Some(Value::Boolean(true))) => {
            Ok(Some(Value::Boolean(true)))
        }
        _ => Ok(None),
    }
}

/// Evaluate an AND/OR composite with its stop value
fn evaluate_composite(
    op: LogicalOp,
    children: &[ExprNode],
    row: &dyn TupleRead,
) -> Result<Option<Value>> {
    let stop = op.stop_value();
    let mut any_indeterminate = false;
    let mut any_null = false;

    for child in children {
        match child.evaluate(row)? {
            Some(Value::Boolean(b)) if b == stop => {
                // Definite stop value: later children are never evaluated
                return Ok(Some(Value::Boolean(stop)));
            }
            Some(Value::Boolean(_)) => {}
            Some(Value::Null) => any_null = true,
            Some(other) => {
                return Err(Error::type_conversion(
                    other.data_type().to_string(),
                    "BOOLEAN",
                ));
            }
            None => any_indeterminate = true,
        }
    }

    if any_indeterminate {
        Ok(None)
    } else if any_null {
        Ok(Some(Value::Null))
    } else {
        Ok(Some(Value::Boolean(!stop)))
    }
}
