//! blockgrid-dispatch — adaptive client pool over the worker fleet.
//!
//! The pool starts every request cycle at a single connection to worker 0.
//! The first completed multiply call's latency (the footprint) sizes it up
//! exactly once against the request's time budget; every call after that
//! is balanced round-robin across the entries.
//!
//! # Request cycle
//!
//! ```text
//! reset_for_new_request(deadline)
//!   └── pool: [worker 0], cursor 0, footprint unset
//! multiply_block()            ← first completed call
//!   ├── footprint := elapsed
//!   ├── target := ceil(footprint * calls / |deadline - footprint|), cap 8
//!   └── pool grows to target (lazy connections, ordinals 1..)
//! multiply_block() / add_block() ×N
//!   └── strict round-robin; failures propagate, never retried
//! ```
//!
//! The deadline is sizing input only. It is never enforced as an RPC
//! timeout and nothing is cancelled when it passes.

pub mod dispatcher;
pub mod error;
pub mod pool;
pub mod scaler;

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, DispatchResult};
pub use pool::{ClientPool, PoolEntry};
