//! blockgrid-core — shared types for blockgrid.
//!
//! `Block` is the unit every subsystem exchanges: a square sub-matrix in
//! row-major order. This crate owns the block numerics (element-wise ops,
//! the full product kernel, quadrant split/join), the text format matrices
//! arrive in, and the configuration types the daemon assembles from.

pub mod block;
pub mod config;
pub mod error;
pub mod text;

pub use block::Block;
pub use config::{ApiConfig, BlockgridConfig, DispatchConfig, FleetConfig, RestartPolicy};
pub use error::{BlockError, BlockResult};
pub use text::parse_matrix;
