//! blockgridd — the blockgrid daemon.
//!
//! Single binary that assembles the blockgrid subsystems:
//! - Worker fleet supervisor (one child process per worker)
//! - Worker unit (gRPC block kernels)
//! - REST API backed by the adaptive dispatch layer
//!
//! # Usage
//!
//! ```text
//! blockgridd standalone --port 8080 --size 8
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use blockgrid_api::{ApiState, build_router};
use blockgrid_core::{BlockgridConfig, DispatchConfig, RestartPolicy};
use blockgrid_worker::{FleetSupervisor, WorkerConfig, run_worker};

#[derive(Parser)]
#[command(name = "blockgridd", about = "blockgrid daemon")]
struct Cli {
    /// Optional TOML config file. Explicit flags win over file values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the worker fleet supervisor.
    Fleet {
        /// Number of workers to launch (default 8).
        #[arg(long)]
        size: Option<usize>,

        /// Host each worker binds.
        #[arg(long)]
        host: Option<String>,

        /// Port of worker 0; worker N listens on base + N.
        #[arg(long)]
        base_port: Option<u16>,

        /// Restart crashed workers, up to this many times each.
        #[arg(long)]
        restart_on_failure: Option<u32>,
    },

    /// Run one worker unit (spawned by `fleet` for its children).
    Worker {
        /// Position of this worker in the fleet.
        #[arg(long)]
        ordinal: usize,

        /// Bind host (the HOST environment variable wins).
        #[arg(long)]
        host: Option<String>,

        /// Port of worker 0 (the PORT environment variable wins).
        #[arg(long)]
        base_port: Option<u16>,
    },

    /// Run the REST API backed by the worker fleet.
    Serve {
        /// HTTP port (default 8080).
        #[arg(long)]
        port: Option<u16>,

        /// Default request deadline in milliseconds (default 50).
        #[arg(long)]
        deadline_ms: Option<f64>,

        /// Upper bound on the connection pool (default 8).
        #[arg(long)]
        workers: Option<usize>,

        /// Host the workers are reachable on.
        #[arg(long)]
        worker_host: Option<String>,

        /// Port of worker 0.
        #[arg(long)]
        worker_base_port: Option<u16>,
    },

    /// Fleet and REST API in one process for local runs.
    Standalone {
        /// HTTP port (default 8080).
        #[arg(long)]
        port: Option<u16>,

        /// Number of workers to launch (default 8).
        #[arg(long)]
        size: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,blockgridd=debug,blockgrid=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BlockgridConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BlockgridConfig::default(),
    };

    match cli.command {
        Command::Fleet {
            size,
            host,
            base_port,
            restart_on_failure,
        } => {
            if let Some(size) = size {
                config.fleet.size = size;
            }
            if let Some(host) = host {
                config.fleet.host = host;
            }
            if let Some(base_port) = base_port {
                config.fleet.base_port = base_port;
            }
            if let Some(max_restarts) = restart_on_failure {
                config.fleet.restart = RestartPolicy::OnFailure { max_restarts };
            }
            run_fleet(config).await
        }
        Command::Worker {
            ordinal,
            host,
            base_port,
        } => {
            if let Some(host) = host {
                config.fleet.host = host;
            }
            if let Some(base_port) = base_port {
                config.fleet.base_port = base_port;
            }
            run_worker_unit(config, ordinal).await
        }
        Command::Serve {
            port,
            deadline_ms,
            workers,
            worker_host,
            worker_base_port,
        } => {
            // Dial-side env overrides first; explicit flags still win.
            apply_dial_env(
                &mut config.dispatch,
                std::env::var("HOST").ok(),
                std::env::var("PORT").ok(),
            )?;
            if let Some(port) = port {
                config.api.port = port;
            }
            if let Some(deadline_ms) = deadline_ms {
                config.dispatch.deadline_ms = deadline_ms;
            }
            if let Some(workers) = workers {
                config.dispatch.max_pool_size = workers;
            }
            if let Some(worker_host) = worker_host {
                config.dispatch.worker_host = worker_host;
            }
            if let Some(worker_base_port) = worker_base_port {
                config.dispatch.worker_base_port = worker_base_port;
            }
            run_serve(config).await
        }
        Command::Standalone { port, size } => {
            if let Some(port) = port {
                config.api.port = port;
            }
            if let Some(size) = size {
                config.fleet.size = size;
            }
            run_standalone(config).await
        }
    }
}

/// Resolves when Ctrl-C arrives.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    info!("shutdown signal received");
}

/// Dial-side environment overrides for `serve`: `HOST` retargets the
/// fleet, `PORT` pins every ordinal to one port.
fn apply_dial_env(
    dispatch: &mut DispatchConfig,
    host: Option<String>,
    port: Option<String>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        dispatch.worker_host = host;
    }
    if let Some(port) = port {
        dispatch.worker_port_override = Some(
            port.parse()
                .with_context(|| format!("invalid PORT {port:?}"))?,
        );
    }
    Ok(())
}

/// Placement a fleet parent passes through the environment.
fn apply_worker_env(
    worker: &mut WorkerConfig,
    host: Option<String>,
    port: Option<String>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        worker.host = host;
    }
    if let Some(port) = port {
        worker.port = port
            .parse()
            .with_context(|| format!("invalid PORT {port:?}"))?;
    }
    Ok(())
}

async fn run_fleet(config: BlockgridConfig) -> anyhow::Result<()> {
    config.validate()?;
    let worker_bin = std::env::current_exe().context("locating worker binary")?;
    let supervisor = FleetSupervisor::new(config.fleet, worker_bin);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    supervisor.run(shutdown_rx).await
}

async fn run_worker_unit(config: BlockgridConfig, ordinal: usize) -> anyhow::Result<()> {
    let port = config
        .fleet
        .checked_worker_port(ordinal)
        .with_context(|| format!("worker {ordinal} runs past the end of the port range"))?;
    let mut worker = WorkerConfig {
        ordinal,
        host: config.fleet.host.clone(),
        port,
    };

    // Fleet parents pass placement through the environment.
    apply_worker_env(
        &mut worker,
        std::env::var("HOST").ok(),
        std::env::var("PORT").ok(),
    )?;

    run_worker(worker, shutdown_signal()).await
}

async fn run_serve(config: BlockgridConfig) -> anyhow::Result<()> {
    config.validate()?;
    let router = build_router(ApiState {
        dispatch: config.dispatch.clone(),
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("blockgrid daemon stopped");
    Ok(())
}

async fn run_standalone(config: BlockgridConfig) -> anyhow::Result<()> {
    config.validate()?;
    info!("blockgrid daemon starting in standalone mode");

    // ── Worker fleet ───────────────────────────────────────────

    let worker_bin = std::env::current_exe().context("locating worker binary")?;
    let supervisor = FleetSupervisor::new(config.fleet.clone(), worker_bin);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let fleet_handle = tokio::spawn(supervisor.run(shutdown_rx));

    // ── API server ─────────────────────────────────────────────

    let router = build_router(ApiState {
        dispatch: config.dispatch.clone(),
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    // Wait for the supervisor to reap its children.
    let _ = fleet_handle.await;

    info!("blockgrid daemon stopped");
    Ok(())
}
