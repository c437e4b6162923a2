//! Error types for schema and table operations.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DataError>;

/// Coarse error classes. Every [`DataError`] variant maps to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A domain invariant was violated or a schema disagrees with its arrays.
    Schema,
    /// Row counts disagree across column groups.
    Dimension,
    /// An operation requires a different variable kind than it was given.
    TypeMismatch,
    /// A name, variable, or logical index was not found in the domain.
    Lookup,
    /// A malformed value, row, or selector.
    InvalidValue,
}

/// Errors raised by domain construction, table construction, indexing,
/// mutation, filtering, and statistics.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    // --- schema ---
    #[error("variable '{0}' is used in more than one role")]
    SharedVariable(String),

    #[error("variable '{0}' is not primitive and cannot be an attribute or class variable")]
    NonPrimitiveVariable(String),

    #[error("{role} expects {expected} columns, array has {got}")]
    ColumnCountMismatch {
        role: &'static str,
        expected: usize,
        got: usize,
    },

    // --- dimension ---
    #[error("{role} has {got} rows, expected {expected}")]
    RowCountMismatch {
        role: &'static str,
        expected: usize,
        got: usize,
    },

    // --- type mismatch ---
    #[error("variable '{name}' is {kind}, expected {expected}")]
    KindMismatch {
        name: String,
        kind: &'static str,
        expected: &'static str,
    },

    #[error("row variable '{0}' must be discrete")]
    RowVariableNotDiscrete(String),

    #[error("column '{0}' holds strings and has no numeric view")]
    StringColumn(String),

    // --- lookup ---
    #[error("no variable named '{0}' in domain")]
    UnknownVariable(String),

    #[error("column index {0} is out of range")]
    ColumnOutOfRange(isize),

    // --- invalid value ---
    #[error("row index {index} is out of range for a table with {len} rows")]
    RowOutOfRange { index: usize, len: usize },

    #[error("value '{value}' is not defined for variable '{variable}'")]
    UnknownValue { variable: String, value: String },

    #[error("row has {got} values, expected {expected}")]
    RowLengthMismatch { expected: usize, got: usize },

    #[error("invalid row selection: {0}")]
    InvalidSelection(String),

    #[error("invalid sparse structure: {0}")]
    InvalidSparse(String),

    #[error("reader error: {0}")]
    Reader(String),
}

impl DataError {
    /// The taxonomy class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        use DataError::*;
        match self {
            SharedVariable(_) | NonPrimitiveVariable(_) | ColumnCountMismatch { .. } => {
                ErrorKind::Schema
            }
            RowCountMismatch { .. } => ErrorKind::Dimension,
            KindMismatch { .. } | RowVariableNotDiscrete(_) | StringColumn(_) => {
                ErrorKind::TypeMismatch
            }
            UnknownVariable(_) | ColumnOutOfRange(_) => ErrorKind::Lookup,
            RowOutOfRange { .. }
            | UnknownValue { .. }
            | RowLengthMismatch { .. }
            | InvalidSelection(_)
            | InvalidSparse(_)
            | Reader(_) => ErrorKind::InvalidValue,
        }
    }
}
