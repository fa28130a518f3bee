//! Adaptive client connection pool.
//!
//! One pool serves one top-level request at a time. It starts at a single
//! connection to worker 0; the first completed multiply latency sizes it
//! up once per cycle; connections are handed out in strict rotation.
//! All state lives behind a single mutex, so cursor advances, growth, the
//! footprint transition, and resets serialize, while the RPCs themselves
//! run concurrently on handed-out client clones.

use tokio::sync::Mutex;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info};

use blockgrid_core::DispatchConfig;
use blockgrid_proto::BlockOpsClient;

use crate::error::{DispatchError, DispatchResult};
use crate::scaler;

/// One pooled connection to a worker.
#[derive(Clone)]
pub struct PoolEntry {
    /// Fleet ordinal this entry dials (`worker_base_port + ordinal`).
    pub ordinal: usize,
    /// Cheap-to-clone client over a shared lazy channel.
    pub client: BlockOpsClient<Channel>,
}

/// Mutable pool state. `entries` is never empty and
/// `cursor < entries.len()` between any two operations.
struct PoolState {
    entries: Vec<PoolEntry>,
    cursor: usize,
    deadline_ms: f64,
    footprint_ms: Option<f64>,
}

/// Adaptive client pool over the worker fleet.
pub struct ClientPool {
    config: DispatchConfig,
    state: Mutex<PoolState>,
}

impl ClientPool {
    /// Create a pool holding a single connection to worker 0.
    ///
    /// Channels connect lazily: the TCP dial happens on first use, so pool
    /// construction, growth, and reset never touch the network.
    pub fn new(config: DispatchConfig) -> DispatchResult<Self> {
        let first = open_entry(&config, 0)?;
        Ok(Self {
            state: Mutex::new(PoolState {
                entries: vec![first],
                cursor: 0,
                deadline_ms: config.deadline_ms,
                footprint_ms: None,
            }),
            config,
        })
    }

    /// Hand out the connection at the cursor and advance it.
    pub async fn next_connection(&self) -> DispatchResult<PoolEntry> {
        let mut state = self.state.lock().await;
        if state.entries.is_empty() {
            return Err(DispatchError::PoolExhausted);
        }
        let entry = state.entries[state.cursor].clone();
        state.cursor = (state.cursor + 1) % state.entries.len();
        debug!(ordinal = entry.ordinal, "connection handed out");
        Ok(entry)
    }

    /// Record the first multiply latency of this cycle and size the pool.
    ///
    /// Exactly one caller per cycle wins the unset-to-set footprint
    /// transition; growth happens in the same critical section, so
    /// concurrent completions can never size the pool twice. Later calls
    /// are no-ops until the next reset.
    pub async fn observe_first_call(&self, latency_ms: f64) -> DispatchResult<()> {
        let mut state = self.state.lock().await;
        if state.footprint_ms.is_some() {
            return Ok(());
        }
        state.footprint_ms = Some(latency_ms);

        let target = scaler::target_pool_size(
            latency_ms,
            state.deadline_ms,
            self.config.calls_per_request,
            self.config.max_pool_size,
        );
        info!(
            footprint_ms = latency_ms,
            deadline_ms = state.deadline_ms,
            target,
            "pool sized from first call"
        );
        self.grow_locked(&mut state, target)
    }

    /// Append entries until the pool holds `to_size` connections.
    ///
    /// Clamped to the configured cap; a target at or below the current
    /// size is a no-op. Entries are never removed outside reset.
    pub async fn grow(&self, to_size: usize) -> DispatchResult<()> {
        let mut state = self.state.lock().await;
        self.grow_locked(&mut state, to_size)
    }

    fn grow_locked(&self, state: &mut PoolState, to_size: usize) -> DispatchResult<()> {
        let target = to_size.min(self.config.max_pool_size);
        while state.entries.len() < target {
            let ordinal = state.entries.len();
            state.entries.push(open_entry(&self.config, ordinal)?);
        }
        Ok(())
    }

    /// Return to the single-connection state for a new request cycle.
    ///
    /// Drops every entry (each channel closes once in-flight calls on its
    /// clones finish), reopens ordinal 0, rewinds the cursor, clears the
    /// footprint, and installs the new deadline. This is the only place
    /// the deadline changes.
    pub async fn reset_for_new_request(&self, deadline_ms: f64) -> DispatchResult<()> {
        let fresh = open_entry(&self.config, 0)?;
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.entries.push(fresh);
        state.cursor = 0;
        state.footprint_ms = None;
        state.deadline_ms = deadline_ms;
        debug!(deadline_ms, "pool reset for new request");
        Ok(())
    }

    /// Current number of pool entries.
    pub async fn size(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// Current rotation cursor.
    pub async fn cursor(&self) -> usize {
        self.state.lock().await.cursor
    }

    /// Footprint of the current cycle, if the first call has completed.
    pub async fn footprint_ms(&self) -> Option<f64> {
        self.state.lock().await.footprint_ms
    }

    /// Time budget of the current cycle.
    pub async fn deadline_ms(&self) -> f64 {
        self.state.lock().await.deadline_ms
    }

    /// Hard cap on pool entries.
    pub fn max_pool_size(&self) -> usize {
        self.config.max_pool_size
    }
}

fn open_entry(config: &DispatchConfig, ordinal: usize) -> DispatchResult<PoolEntry> {
    let uri = config.worker_endpoint(ordinal);
    let endpoint = Endpoint::from_shared(uri.clone())
        .map_err(|source| DispatchError::Endpoint { uri, source })?;
    Ok(PoolEntry {
        ordinal,
        client: BlockOpsClient::new(endpoint.connect_lazy()),
    })
}
