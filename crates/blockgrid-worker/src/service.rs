//! Worker-side gRPC service.
//!
//! Stateless per call: reshape the operands, run the kernel, flatten the
//! result. Malformed payloads are rejected with `InvalidArgument` before
//! any arithmetic runs.

use std::future::Future;
use std::net::SocketAddr;

use tonic::{Request, Response, Status};
use tracing::{debug, info};

use blockgrid_proto::proto;
use blockgrid_proto::{BlockOps, BlockOpsServer, convert};

/// gRPC implementation of the block operations service.
#[derive(Debug, Default)]
pub struct BlockOpsService;

impl BlockOpsService {
    pub fn new() -> Self {
        Self
    }

    /// Get the tonic service for mounting on a gRPC server.
    pub fn into_service(self) -> BlockOpsServer<Self> {
        BlockOpsServer::new(self)
    }
}

#[tonic::async_trait]
impl BlockOps for BlockOpsService {
    async fn multiply_block(
        &self,
        request: Request<proto::BlockPair>,
    ) -> Result<Response<proto::BlockReply>, Status> {
        let (a, b) = convert::pair_from_wire(request.into_inner())
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        debug!(dim = a.dim(), "multiplying block pair");
        let product = a.multiply(&b);

        Ok(Response::new(convert::block_to_reply(&product)))
    }

    async fn add_block(
        &self,
        request: Request<proto::BlockPair>,
    ) -> Result<Response<proto::BlockReply>, Status> {
        let (a, b) = convert::pair_from_wire(request.into_inner())
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        debug!(dim = a.dim(), "adding block pair");
        let sum = a.add(&b);

        Ok(Response::new(convert::block_to_reply(&sum)))
    }
}

/// Address configuration for a single worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Position in the fleet (names the worker in logs).
    pub ordinal: usize,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl WorkerConfig {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port).parse()?;
        Ok(addr)
    }
}

/// Serve block operations until `shutdown` resolves.
pub async fn run_worker(
    config: WorkerConfig,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    info!(ordinal = config.ordinal, %addr, "worker serving block operations");

    tonic::transport::Server::builder()
        .add_service(BlockOpsService::new().into_service())
        .serve_with_shutdown(addr, shutdown)
        .await?;

    info!(ordinal = config.ordinal, "worker stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn multiply_computes_full_product() {
        let svc = BlockOpsService::new();
        let req = Request::new(proto::BlockPair {
            a: vec![1.0, 2.0, 3.0, 4.0],
            b: vec![5.0, 6.0, 7.0, 8.0],
            max: 2,
        });

        let reply = svc.multiply_block(req).await.unwrap().into_inner();
        assert_eq!(reply.max, 2);
        assert_eq!(reply.block, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[tokio::test]
    async fn add_sums_elementwise() {
        let svc = BlockOpsService::new();
        let req = Request::new(proto::BlockPair {
            a: vec![1.0, 2.0, 3.0, 4.0],
            b: vec![10.0, 20.0, 30.0, 40.0],
            max: 2,
        });

        let reply = svc.add_block(req).await.unwrap().into_inner();
        assert_eq!(reply.block, vec![11.0, 22.0, 33.0, 44.0]);
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected() {
        let svc = BlockOpsService::new();
        let req = Request::new(proto::BlockPair {
            a: vec![1.0, 2.0, 3.0],
            b: vec![1.0; 4],
            max: 2,
        });

        let status = svc.multiply_block(req).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn zero_dimension_is_rejected() {
        let svc = BlockOpsService::new();
        let req = Request::new(proto::BlockPair {
            a: vec![],
            b: vec![],
            max: 0,
        });

        let status = svc.add_block(req).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn worker_config_addresses() {
        let config = WorkerConfig {
            ordinal: 3,
            host: "127.0.0.1".to_string(),
            port: 30043,
        };
        assert_eq!(config.bind_addr().unwrap().port(), 30043);

        let bad = WorkerConfig {
            ordinal: 0,
            host: "not a host".to_string(),
            port: 1,
        };
        assert!(bad.bind_addr().is_err());
    }
}
