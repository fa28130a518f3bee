//! blockgrid-proto — the wire protocol between dispatcher and workers.
//!
//! Every worker serves the `BlockOps` gRPC service: two unary methods,
//! `MultiplyBlock` and `AddBlock`, both taking a [`proto::BlockPair`] of
//! flattened operands and returning a [`proto::BlockReply`]. The
//! [`convert`] module validates payload shapes when crossing between the
//! wire types and [`blockgrid_core::Block`].

pub mod convert;

/// Generated protobuf types and gRPC service stubs.
pub mod proto {
    tonic::include_proto!("blockgrid.blockops");
}

pub use convert::WireError;
pub use proto::block_ops_client::BlockOpsClient;
pub use proto::block_ops_server::{BlockOps, BlockOpsServer};
