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

//! Value type for kvexec - runtime cell values
//!
//! This module provides a unified Value enum representing SQL values, with
//! comparison semantics and the tagged byte encoding used for join-key
//! serialization and flat output encoding.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use super::error::{Error, Result};
use super::types::DataType;

// Byte-encoding type tags. Stable across the wire between the broadcast
// step that builds hash caches and the partitions that probe them.
const TAG_NULL: u8 = 0;
const TAG_BOOLEAN: u8 = 1;
const TAG_INTEGER: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_TEXT: u8 = 4;
const TAG_TIMESTAMP: u8 = 5;

/// A runtime cell value
///
/// Each variant carries its data directly. Text uses `Arc<str>` for cheap
/// cloning during cross-expansion, where one cached candidate row may be
/// merged into many output tuples.
#[derive(Debug, Clone)]
pub enum Value {
    /// SQL NULL
    Null,

    /// 64-bit signed integer
    Integer(i64),

    /// 64-bit floating point
    Float(f64),

    /// UTF-8 text string (Arc for cheap cloning)
    Text(Arc<str>),

    /// Boolean value
    Boolean(bool),

    /// Timestamp (UTC)
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Create a text value
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(Arc::from(value.into().as_str()))
    }

    /// Create an integer value
    pub fn integer(value: i64) -> Self {
        Value::Integer(value)
    }

    /// Create a float value
    pub fn float(value: f64) -> Self {
        Value::Float(value)
    }

    /// Create a boolean value
    pub fn boolean(value: bool) -> Self {
        Value::Boolean(value)
    }

    /// Get the data type of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::Text,
            Value::Boolean(_) => DataType::Boolean,
            Value::Timestamp(_) => DataType::Timestamp,
        }
    }

    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as i64 if integer
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64, converting integers
    pub fn as_float64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as bool if boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as &str if text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret this value as a definite boolean, failing with a
    /// conversion error for non-boolean types
    pub fn to_boolean(&self) -> Result<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(Error::type_conversion(
                other.data_type().to_string(),
                DataType::Boolean.to_string(),
            )),
        }
    }

    /// Compare two values
    ///
    /// Returns the ordering, or an error when the values cannot be
    /// compared: NULL against anything, or incompatible non-numeric
    /// types. Callers implementing SQL semantics must handle NULL before
    /// calling.
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        if self.is_null() || other.is_null() {
            if self.is_null() && other.is_null() {
                return Ok(Ordering::Equal);
            }
            return Err(Error::NullComparison);
        }

        // Same type comparison (most efficient path)
        if self.data_type() == other.data_type() {
            return self.compare_same_type(other);
        }

        // Cross-type numeric comparison (integer vs float)
        if self.data_type().is_numeric() && other.data_type().is_numeric() {
            let v1 = self.as_float64().unwrap_or_default();
            let v2 = other.as_float64().unwrap_or_default();
            return Ok(compare_floats(v1, v2));
        }

        Err(Error::IncomparableTypes)
    }

    fn compare_same_type(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => Ok(compare_floats(*a, *b)),
            (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Ok(a.cmp(b)),
            _ => Err(Error::IncomparableTypes),
        }
    }

    // =========================================================================
    // Byte encoding
    // =========================================================================

    /// Append the tagged byte encoding of this value to `buf`
    ///
    /// The encoding is self-delimiting, so several values concatenated
    /// into one buffer (a join probe key) decode unambiguously.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Value::Null => buf.push(TAG_NULL),
            Value::Boolean(b) => {
                buf.push(TAG_BOOLEAN);
                buf.push(u8::from(*b));
            }
            Value::Integer(i) => {
                buf.push(TAG_INTEGER);
                buf.extend_from_slice(&i.to_le_bytes());
            }
            Value::Float(f) => {
                buf.push(TAG_FLOAT);
                buf.extend_from_slice(&f.to_le_bytes());
            }
            Value::Text(s) => {
                buf.push(TAG_TEXT);
                buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
            Value::Timestamp(ts) => {
                buf.push(TAG_TIMESTAMP);
                buf.extend_from_slice(&ts.timestamp().to_le_bytes());
                buf.extend_from_slice(&ts.timestamp_subsec_nanos().to_le_bytes());
            }
        }
    }

    /// Encode this value into a fresh buffer
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Decode one value from the front of `data`
    ///
    /// Returns the value and the number of bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Value, usize)> {
        let Some((&tag, rest)) = data.split_first() else {
            return Err(Error::value_decode("empty value data"));
        };

        match tag {
            TAG_NULL => Ok((Value::Null, 1)),
            TAG_BOOLEAN => {
                let b = rest
                    .first()
                    .ok_or_else(|| Error::value_decode("missing boolean byte"))?;
                Ok((Value::Boolean(*b != 0), 2))
            }
            TAG_INTEGER => {
                let bytes = rest
                    .get(..8)
                    .ok_or_else(|| Error::value_decode("missing integer bytes"))?;
                let i = i64::from_le_bytes(bytes.try_into().expect("8-byte slice"));
                Ok((Value::Integer(i), 9))
            }
            TAG_FLOAT => {
                let bytes = rest
                    .get(..8)
                    .ok_or_else(|| Error::value_decode("missing float bytes"))?;
                let f = f64::from_le_bytes(bytes.try_into().expect("8-byte slice"));
                Ok((Value::Float(f), 9))
            }
            TAG_TEXT => {
                let len_bytes = rest
                    .get(..4)
                    .ok_or_else(|| Error::value_decode("missing text length"))?;
                let len = u32::from_le_bytes(len_bytes.try_into().expect("4-byte slice")) as usize;
                let text = rest
                    .get(4..4 + len)
                    .ok_or_else(|| Error::value_decode("missing text data"))?;
                let s = std::str::from_utf8(text)
                    .map_err(|e| Error::value_decode(format!("invalid text: {e}")))?;
                Ok((Value::text(s), 1 + 4 + len))
            }
            TAG_TIMESTAMP => {
                let bytes = rest
                    .get(..12)
                    .ok_or_else(|| Error::value_decode("missing timestamp bytes"))?;
                let secs = i64::from_le_bytes(bytes[..8].try_into().expect("8-byte slice"));
                let nanos = u32::from_le_bytes(bytes[8..12].try_into().expect("4-byte slice"));
                let ts = Utc
                    .timestamp_opt(secs, nanos)
                    .single()
                    .ok_or_else(|| Error::value_decode("timestamp out of range"))?;
                Ok((Value::Timestamp(ts), 13))
            }
            other => Err(Error::value_decode(format!("unknown type tag {other}"))),
        }
    }
}

/// Total ordering for floats: NaN sorts last, as in ORDER BY semantics
fn compare_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_same_type() {
        assert_eq!(
            Value::integer(1).compare(&Value::integer(2)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Value::text("b").compare(&Value::text("a")).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            Value::boolean(true).compare(&Value::boolean(true)).unwrap(),
            Ordering::Equal
        );
    }

    #[test]
    fn test_compare_cross_numeric() {
        assert_eq!(
            Value::integer(2).compare(&Value::float(2.0)).unwrap(),
            Ordering::Equal
        );
        assert_eq!(
            Value::float(1.5).compare(&Value::integer(2)).unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn test_compare_errors() {
        assert_eq!(
            Value::Null.compare(&Value::integer(1)),
            Err(Error::NullComparison)
        );
        assert_eq!(
            Value::text("1").compare(&Value::integer(1)),
            Err(Error::IncomparableTypes)
        );
    }

    #[test]
    fn test_encode_roundtrip() {
        let values = vec![
            Value::Null,
            Value::integer(-42),
            Value::float(3.25),
            Value::text("hello"),
            Value::boolean(true),
            Value::Timestamp(Utc.timestamp_opt(1_700_000_000, 123).unwrap()),
        ];
        for v in values {
            let buf = v.encode();
            let (decoded, consumed) = Value::decode(&buf).unwrap();
            assert_eq!(decoded, v);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn test_decode_concatenated() {
        let mut buf = Vec::new();
        Value::integer(7).encode_into(&mut buf);
        Value::text("k").encode_into(&mut buf);

        let (first, consumed) = Value::decode(&buf).unwrap();
        assert_eq!(first, Value::integer(7));
        let (second, rest) = Value::decode(&buf[consumed..]).unwrap();
        assert_eq!(second, Value::text("k"));
        assert_eq!(consumed + rest, buf.len());
    }

    #[test]
    fn test_decode_truncated() {
        let buf = Value::integer(7).encode();
        let err = Value::decode(&buf[..4]).unwrap_err();
        assert!(err.is_decode());

        assert!(Value::decode(&[]).unwrap_err().is_decode());
        assert!(Value::decode(&[99]).unwrap_err().is_decode());
    }

    #[test]
    fn test_to_boolean() {
        assert!(Value::boolean(true).to_boolean().unwrap());
        assert!(Value::integer(1).to_boolean().unwrap_err().is_decode());
    }
}
