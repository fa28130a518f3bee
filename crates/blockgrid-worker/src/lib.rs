//! blockgrid-worker — fleet compute units.
//!
//! Two halves: [`service`] implements the `BlockOps` gRPC methods one
//! worker serves, [`fleet`] launches and supervises one worker process
//! per ordinal. Workers are stateless; all coordination lives on the
//! dispatch side.

pub mod fleet;
pub mod service;

pub use fleet::{FleetSupervisor, WorkerExit};
pub use service::{BlockOpsService, WorkerConfig, run_worker};
