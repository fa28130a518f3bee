//! Block and matrix parsing error types.

use thiserror::Error;

/// Errors that can occur constructing or transforming blocks.
#[derive(Debug, Error, PartialEq)]
pub enum BlockError {
    #[error("matrix is empty")]
    Empty,

    #[error("row {row} has {got} values, expected {expected}")]
    RaggedRow {
        row: usize,
        got: usize,
        expected: usize,
    },

    #[error("matrix has {rows} rows but {cols} columns, must be square")]
    NotSquare { rows: usize, cols: usize },

    #[error("{len} values do not form a {dim}x{dim} block")]
    LengthMismatch { len: usize, dim: usize },

    #[error("invalid matrix value {value:?} in row {row}")]
    BadNumber { row: usize, value: String },

    #[error("block of dimension {0} cannot be split into quadrants")]
    NotSplittable(usize),

    #[error("quadrants have mismatched dimensions")]
    QuadrantMismatch,
}

pub type BlockResult<T> = Result<T, BlockError>;
