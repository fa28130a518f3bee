//! RPC wrappers over the pooled worker clients.
//!
//! `multiply_block` is the measured path: the elapsed wall time of each
//! call is offered to the pool, and the first completed one per cycle
//! seeds the sizing. `add_block` never participates in measurement.
//! Failures propagate to the caller untouched; there is no retry and no
//! failover to another entry.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use blockgrid_core::Block;
use blockgrid_proto::convert;

use crate::error::DispatchResult;
use crate::pool::ClientPool;

/// Issues block operations against the worker fleet through the pool.
#[derive(Clone)]
pub struct Dispatcher {
    pool: Arc<ClientPool>,
}

impl Dispatcher {
    pub fn new(pool: Arc<ClientPool>) -> Self {
        Self { pool }
    }

    /// The underlying pool (sizing state, diagnostics).
    pub fn pool(&self) -> &ClientPool {
        &self.pool
    }

    /// Remote full product of two blocks of side `max`.
    pub async fn multiply_block(&self, a: &Block, b: &Block, max: u32) -> DispatchResult<Block> {
        let entry = self.pool.next_connection().await?;
        debug!(ordinal = entry.ordinal, max, "dispatching multiply");

        let request = convert::pair_to_wire(a, b, max);
        let started = Instant::now();
        let mut client = entry.client;
        let reply = client.multiply_block(request).await?.into_inner();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.pool.observe_first_call(elapsed_ms).await?;
        Ok(convert::reply_to_block(reply)?)
    }

    /// Remote element-wise sum of two blocks of side `max`.
    pub async fn add_block(&self, a: &Block, b: &Block, max: u32) -> DispatchResult<Block> {
        let entry = self.pool.next_connection().await?;
        debug!(ordinal = entry.ordinal, max, "dispatching add");

        let request = convert::pair_to_wire(a, b, max);
        let mut client = entry.client;
        let reply = client.add_block(request).await?.into_inner();
        Ok(convert::reply_to_block(reply)?)
    }

    /// Start a new request cycle with the given time budget.
    ///
    /// Must run before the first primitive call of every top-level
    /// request; it is the only mutation point for the deadline.
    pub async fn reset_for_new_request(&self, deadline_ms: f64) -> DispatchResult<()> {
        self.pool.reset_for_new_request(deadline_ms).await
    }
}
