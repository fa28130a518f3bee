//! Engine error types.

use blockgrid_core::BlockError;
use blockgrid_dispatch::DispatchError;
use thiserror::Error;

/// Errors that can occur while decomposing and dispatching a multiply.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The two operands are square but of different orders.
    #[error("operand dimensions differ: {a}x{a} vs {b}x{b}")]
    DimensionMismatch { a: usize, b: usize },

    /// Quadrant decomposition needs an even split at every level the
    /// engine performs, so operand order must be a power of two.
    #[error("matrix dimension {0} is not a power of two")]
    NotPowerOfTwo(usize),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Block(#[from] BlockError),
}

pub type EngineResult<T> = Result<T, EngineError>;
