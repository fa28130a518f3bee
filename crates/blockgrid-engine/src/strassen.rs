//! One-level Strassen decomposition driven through the dispatcher.
//!
//! A multiply request splits both operands into quadrants, forms the
//! seven Strassen operand combinations locally, and farms the seven
//! half-order products out to the worker fleet as concurrent RPCs.
//! Quadrant recombination runs as eight add RPCs (subtraction rides an
//! add with a locally negated operand). Recursion stops there: workers
//! multiply their half-order blocks with the plain cubic kernel.

use blockgrid_core::Block;
use blockgrid_dispatch::Dispatcher;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Distributed block multiplier.
///
/// Each call to [`multiply`](Self::multiply) is one request cycle: the
/// pool is reset to a single connection, the first product's latency
/// sizes it, and the remaining traffic is balanced across the fleet.
#[derive(Clone)]
pub struct MultiplyEngine {
    dispatcher: Dispatcher,
}

impl MultiplyEngine {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Multiply two square blocks under the given time budget.
    ///
    /// Operands must be the same order, and the order must be a power
    /// of two so the quadrant split is exact. A 1x1 product has nothing
    /// to decompose and is computed locally without touching the fleet.
    pub async fn multiply(&self, a: &Block, b: &Block, deadline_ms: f64) -> EngineResult<Block> {
        if a.dim() != b.dim() {
            return Err(EngineError::DimensionMismatch {
                a: a.dim(),
                b: b.dim(),
            });
        }
        let dim = a.dim();
        if !dim.is_power_of_two() {
            return Err(EngineError::NotPowerOfTwo(dim));
        }

        self.dispatcher.reset_for_new_request(deadline_ms).await?;

        if dim == 1 {
            return Ok(a.multiply(b));
        }

        let [a11, a12, a21, a22] = a.split_quadrants()?;
        let [b11, b12, b21, b22] = b.split_quadrants()?;
        let half = (dim / 2) as u32;

        debug!(dim, half, deadline_ms, "dispatching strassen products");

        // The seven Strassen products, all in flight at once. The first
        // one to complete seeds the pool's footprint.
        let (m1, m2, m3, m4, m5, m6, m7) = tokio::try_join!(
            self.product(a11.add(&a22), b11.add(&b22), half),
            self.product(a21.add(&a22), b11.clone(), half),
            self.product(a11.clone(), b12.sub(&b22), half),
            self.product(a22.clone(), b21.sub(&b11), half),
            self.product(a11.add(&a12), b22.clone(), half),
            self.product(a21.sub(&a11), b11.add(&b12), half),
            self.product(a12.sub(&a22), b21.add(&b22), half),
        )?;

        // C11 = M1 + M4 - M5 + M7     C12 = M3 + M5
        // C21 = M2 + M4               C22 = M1 - M2 + M3 + M6
        let m5_neg = m5.negated();
        let m2_neg = m2.negated();
        let (c11, c12, c21, c22) = tokio::try_join!(
            self.sum4(&m1, &m4, &m7, &m5_neg, half),
            self.sum(&m3, &m5, half),
            self.sum(&m2, &m4, half),
            self.sum4(&m1, &m3, &m6, &m2_neg, half),
        )?;

        Ok(Block::join_quadrants(&c11, &c12, &c21, &c22)?)
    }

    async fn product(&self, a: Block, b: Block, max: u32) -> EngineResult<Block> {
        Ok(self.dispatcher.multiply_block(&a, &b, max).await?)
    }

    async fn sum(&self, a: &Block, b: &Block, max: u32) -> EngineResult<Block> {
        Ok(self.dispatcher.add_block(a, b, max).await?)
    }

    /// `a + b + c + d` in three add RPCs, the first two concurrent.
    async fn sum4(
        &self,
        a: &Block,
        b: &Block,
        c: &Block,
        d: &Block,
        max: u32,
    ) -> EngineResult<Block> {
        let (left, right) = tokio::try_join!(self.sum(a, b, max), self.sum(c, d, max))?;
        self.sum(&left, &right, max).await
    }
}
