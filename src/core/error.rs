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

//! Error types for kvexec
//!
//! This module defines all error types used throughout the execution core.

use thiserror::Error;

/// Result type alias for kvexec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for kvexec operations
///
/// This enum covers all error cases including both sentinel errors
/// and structured errors with context. Construction-time errors
/// (unsupported join type, missing hash cache) abort a scan before any
/// row is processed; decode errors during evaluation are recovered
/// locally by dropping the offending tuple.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Configuration errors (fatal at construction)
    // =========================================================================
    /// Join type other than INNER or LEFT requested for hash-join execution
    #[error("got join type '{0}', expect only INNER or LEFT with hash-joins")]
    UnsupportedJoinType(String),

    /// Hash cache for a declared join id was not found in the registry
    #[error("could not find hash cache for join id {0}")]
    HashCacheMissing(String),

    /// Join clause columns do not fit inside the joined schema
    #[error("join clause {clause} does not fit joined schema: needs {required} slots, schema has {available}")]
    ClauseOutOfBounds {
        clause: usize,
        required: usize,
        available: usize,
    },

    /// Projection references more columns than the destination schema holds
    #[error("projection has {got} columns, destination schema has {expected}")]
    ProjectionTooWide { expected: usize, got: usize },

    // =========================================================================
    // Unsupported operations (fatal per call)
    // =========================================================================
    /// Operation not supported
    #[error("not supported: {0}")]
    NotSupported(String),

    // =========================================================================
    // Column errors
    // =========================================================================
    /// Column reference could not be resolved
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// Column index out of bounds
    #[error("column index {index} out of bounds")]
    ColumnIndexOutOfBounds { index: usize },

    // =========================================================================
    // Value and decode errors (recoverable during evaluation)
    // =========================================================================
    /// Type conversion error
    #[error("type conversion error: cannot convert {from} to {to}")]
    TypeConversion { from: String, to: String },

    /// Value byte decoding failed
    #[error("value decode failed: {0}")]
    ValueDecode(String),

    /// Cannot compare NULL with non-NULL value
    #[error("cannot compare NULL with non-NULL value")]
    NullComparison,

    /// Cannot compare incompatible types
    #[error("cannot compare incompatible types")]
    IncomparableTypes,

    // =========================================================================
    // Other errors
    // =========================================================================
    /// Internal error for unexpected conditions
    #[error("{message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new UnsupportedJoinType error
    pub fn unsupported_join_type(join_type: impl Into<String>) -> Self {
        Error::UnsupportedJoinType(join_type.into())
    }

    /// Create a new HashCacheMissing error from a raw join id
    pub fn hash_cache_missing(join_id: &[u8]) -> Self {
        let hex: String = join_id.iter().map(|b| format!("{b:02x}")).collect();
        Error::HashCacheMissing(hex)
    }

    /// Create a new NotSupported error
    pub fn not_supported(message: impl Into<String>) -> Self {
        Error::NotSupported(message.into())
    }

    /// Create a new TypeConversion error
    pub fn type_conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        Error::TypeConversion {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create a new ValueDecode error
    pub fn value_decode(message: impl Into<String>) -> Self {
        Error::ValueDecode(message.into())
    }

    /// Create a new Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Check if this is a construction-time (scan-fatal) error
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedJoinType(_)
                | Error::HashCacheMissing(_)
                | Error::ClauseOutOfBounds { .. }
                | Error::ProjectionTooWide { .. }
        )
    }

    /// Check if this is a decode-type error recovered locally during
    /// evaluation (the offending tuple is dropped, the scan continues)
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Error::TypeConversion { .. }
                | Error::ValueDecode(_)
                | Error::NullComparison
                | Error::IncomparableTypes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::unsupported_join_type("Full").to_string(),
            "got join type 'Full', expect only INNER or LEFT with hash-joins"
        );
        assert_eq!(
            Error::hash_cache_missing(&[0xde, 0xad]).to_string(),
            "could not find hash cache for join id dead"
        );
        assert_eq!(
            Error::ColumnNotFound("email".to_string()).to_string(),
            "column 'email' not found"
        );
        assert_eq!(
            Error::type_conversion("TEXT", "BOOLEAN").to_string(),
            "type conversion error: cannot convert TEXT to BOOLEAN"
        );
        assert_eq!(
            Error::not_supported("limit with joins").to_string(),
            "not supported: limit with joins"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::unsupported_join_type("Right").is_configuration());
        assert!(Error::hash_cache_missing(&[1]).is_configuration());
        assert!(!Error::NullComparison.is_configuration());

        assert!(Error::value_decode("truncated").is_decode());
        assert!(Error::type_conversion("TEXT", "INTEGER").is_decode());
        assert!(Error::IncomparableTypes.is_decode());
        assert!(!Error::not_supported("x").is_decode());
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            Error::ColumnNotFound("a".to_string()),
            Error::ColumnNotFound("a".to_string())
        );
        assert_ne!(
            Error::ColumnNotFound("a".to_string()),
            Error::ColumnNotFound("b".to_string())
        );
    }
}
