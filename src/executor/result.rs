// Join Result Types
//
// This module defines the error type shared by every join operator and the
// bundled value type used by the CLI, tests and benches.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scalar value carried in a row.
///
/// The join engine is generic over its value type; `DataValue` is the one the
/// crate ships so rows can be read from and written to JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

// Floats compare by bit pattern so that equality agrees with hashing
impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DataValue::Boolean(a), DataValue::Boolean(b)) => a == b,
            (DataValue::Integer(a), DataValue::Integer(b)) => a == b,
            (DataValue::Float(a), DataValue::Float(b)) => a.to_bits() == b.to_bits(),
            (DataValue::Text(a), DataValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for DataValue {}

impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            DataValue::Boolean(b) => {
                1.hash(state);
                b.hash(state);
            }
            DataValue::Integer(i) => {
                2.hash(state);
                i.hash(state);
            }
            DataValue::Float(f) => {
                3.hash(state);
                f.to_bits().hash(state);
            }
            DataValue::Text(s) => {
                4.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Boolean(b) => write!(f, "{}", b),
            DataValue::Integer(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Integer(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::Text(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        DataValue::Text(value)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        DataValue::Boolean(value)
    }
}

/// Errors surfaced by join operators and row sources
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JoinError {
    /// Operation attempted in a phase that does not allow it
    #[error("Illegal state: {0}")]
    IllegalState(String),
    /// Failure raised by an upstream row source
    #[error("Execution error: {0}")]
    ExecutionError(String),
    /// A row builder was asked to bind a variable twice with different values
    #[error("Duplicate variable: {0}")]
    DuplicateVariable(String),
    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type for join operations
pub type JoinResult<T> = Result<T, JoinError>;
