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

//! Data types and comparison operators

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::error::Error;

/// SQL data types supported by the execution core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    /// NULL type (unknown)
    Null = 0,
    /// 64-bit signed integer
    Integer = 1,
    /// 64-bit floating point
    Float = 2,
    /// UTF-8 text
    Text = 3,
    /// Boolean
    Boolean = 4,
    /// Timestamp with timezone (UTC)
    Timestamp = 5,
}

impl DataType {
    /// Check if this type is numeric (can be compared cross-type)
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    /// Returns the type ID as u8 for serialization
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Create DataType from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DataType::Null),
            1 => Some(DataType::Integer),
            2 => Some(DataType::Float),
            3 => Some(DataType::Text),
            4 => Some(DataType::Boolean),
            5 => Some(DataType::Timestamp),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Null => write!(f, "NULL"),
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Text => write!(f, "TEXT"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NULL" => Ok(DataType::Null),
            "INTEGER" | "INT" | "BIGINT" | "SMALLINT" => Ok(DataType::Integer),
            "FLOAT" | "DOUBLE" | "REAL" => Ok(DataType::Float),
            "TEXT" | "VARCHAR" | "CHAR" | "STRING" => Ok(DataType::Text),
            "BOOLEAN" | "BOOL" => Ok(DataType::Boolean),
            "TIMESTAMP" | "DATETIME" => Ok(DataType::Timestamp),
            other => Err(Error::internal(format!("unknown data type '{other}'"))),
        }
    }
}

/// Comparison operators for predicate expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operator {
    /// Equality (=)
    Eq = 0,

    /// Inequality (!=)
    Ne = 1,

    /// Greater than (>)
    Gt = 2,

    /// Greater than or equal (>=)
    Gte = 3,

    /// Less than (<)
    Lt = 4,

    /// Less than or equal (<=)
    Lte = 5,
}

impl Operator {
    /// Returns the operator that preserves truth value when the two
    /// operands are swapped: `a < b` is `b > a`, `a <= b` is `b >= a`,
    /// while `=` and `!=` are symmetric.
    pub fn invert(self) -> Self {
        match self {
            Operator::Eq => Operator::Eq,
            Operator::Ne => Operator::Ne,
            Operator::Gt => Operator::Lt,
            Operator::Gte => Operator::Lte,
            Operator::Lt => Operator::Gt,
            Operator::Lte => Operator::Gte,
        }
    }

    /// Apply the operator to the ordering of `left.compare(right)`
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Ne => ordering != Ordering::Equal,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Gte => ordering != Ordering::Less,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Lte => ordering != Ordering::Greater,
        }
    }

    /// SQL symbol for display
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert_is_involution() {
        let all = [
            Operator::Eq,
            Operator::Ne,
            Operator::Gt,
            Operator::Gte,
            Operator::Lt,
            Operator::Lte,
        ];
        for op in all {
            assert_eq!(op.invert().invert(), op);
        }
    }

    #[test]
    fn test_invert_preserves_truth_under_swap() {
        // For all orderings: op.matches(cmp(a,b)) == op.invert().matches(cmp(b,a))
        let all = [
            Operator::Eq,
            Operator::Ne,
            Operator::Gt,
            Operator::Gte,
            Operator::Lt,
            Operator::Lte,
        ];
        let orderings = [Ordering::Less, Ordering::Equal, Ordering::Greater];
        for op in all {
            for ord in orderings {
                assert_eq!(
                    op.matches(ord),
                    op.invert().matches(ord.reverse()),
                    "swap mismatch for {op} over {ord:?}"
                );
            }
        }
    }

    #[test]
    fn test_matches() {
        assert!(Operator::Eq.matches(Ordering::Equal));
        assert!(!Operator::Eq.matches(Ordering::Less));
        assert!(Operator::Lte.matches(Ordering::Equal));
        assert!(Operator::Lte.matches(Ordering::Less));
        assert!(!Operator::Lte.matches(Ordering::Greater));
        assert!(Operator::Ne.matches(Ordering::Greater));
    }

    #[test]
    fn test_data_type_roundtrip() {
        for v in 0..=5u8 {
            let dt = DataType::from_u8(v).unwrap();
            assert_eq!(dt.as_u8(), v);
        }
        assert!(DataType::from_u8(99).is_none());
    }

    #[test]
    fn test_data_type_parse() {
        assert_eq!("integer".parse::<DataType>().unwrap(), DataType::Integer);
        assert_eq!("VARCHAR".parse::<DataType>().unwrap(), DataType::Text);
        assert!("vector".parse::<DataType>().is_err());
    }
}
