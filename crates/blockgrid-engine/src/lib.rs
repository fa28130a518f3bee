//! blockgrid-engine — distributed block multiplication.
//!
//! Sits between the HTTP surface and the dispatch layer. Validates the
//! operands, performs one level of Strassen decomposition, and turns a
//! single logical multiply into seven multiply RPCs plus eight add RPCs
//! spread across the worker fleet.

pub mod error;
pub mod strassen;

pub use error::{EngineError, EngineResult};
pub use strassen::MultiplyEngine;
