//! Dispatch error types.

use thiserror::Error;

/// Errors that can occur in the dispatch layer.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The pool has no entries. Reachable only through broken
    /// configuration; every reset leaves one connection behind.
    #[error("connection pool has no entries")]
    PoolExhausted,

    /// A worker RPC failed (unreachable worker, remote fault). Propagated
    /// to the caller as-is; the dispatch layer never retries.
    #[error("worker rpc failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("invalid worker endpoint {uri}")]
    Endpoint {
        uri: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("malformed reply payload: {0}")]
    Wire(#[from] blockgrid_proto::WireError),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
