//! Worker fleet supervisor.
//!
//! Spawns one OS process per ordinal by re-invoking the daemon binary
//! with `worker --ordinal N`, passing `HOST`/`PORT` through the
//! environment. Exits are logged and handled per the configured
//! [`RestartPolicy`]; children are killed when the supervisor shuts down.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use anyhow::Context;
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use blockgrid_core::{FleetConfig, RestartPolicy};

/// A worker exit event observed by the supervisor.
#[derive(Debug)]
pub struct WorkerExit {
    pub ordinal: usize,
    /// `None` when the exit status could not be collected.
    pub status: Option<ExitStatus>,
}

impl WorkerExit {
    /// Whether the worker terminated cleanly.
    pub fn success(&self) -> bool {
        self.status.map(|s| s.success()).unwrap_or(false)
    }
}

/// Launches and supervises one worker process per ordinal.
pub struct FleetSupervisor {
    config: FleetConfig,
    /// Binary re-invoked with the `worker` subcommand for each child.
    worker_bin: PathBuf,
    /// Restart attempts used per ordinal.
    restarts: HashMap<usize, u32>,
}

impl FleetSupervisor {
    pub fn new(config: FleetConfig, worker_bin: PathBuf) -> Self {
        Self {
            config,
            worker_bin,
            restarts: HashMap::new(),
        }
    }

    /// Spawn the fleet and supervise it until `shutdown` fires.
    ///
    /// Workers that exit are logged. With [`RestartPolicy::Never`] the
    /// ordinal stays vacant; with [`RestartPolicy::OnFailure`] failed
    /// workers are respawned with a doubling backoff until the restart
    /// budget runs out. The supervisor itself keeps running either way,
    /// matching the fleet's role as a fixed set of addresses: a dead
    /// ordinal surfaces as a connection error at dispatch time, not as a
    /// fleet-wide failure.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let (exit_tx, mut exit_rx) = mpsc::unbounded_channel();

        for ordinal in 0..self.config.size {
            self.launch(ordinal, &exit_tx, &shutdown)?;
        }
        info!(
            size = self.config.size,
            base_port = self.config.base_port,
            "fleet started"
        );

        let mut live = self.config.size;
        loop {
            let event = tokio::select! {
                Some(exit) = exit_rx.recv() => Some(exit),
                _ = shutdown.changed() => None,
            };

            let exit = match event {
                Some(exit) => exit,
                None => {
                    info!("fleet supervisor shutting down");
                    break;
                }
            };

            warn!(
                ordinal = exit.ordinal,
                status = ?exit.status,
                "worker exited"
            );

            match self.config.restart {
                RestartPolicy::Never => {
                    live -= 1;
                    if live == 0 {
                        warn!("no live workers remain");
                    }
                }
                RestartPolicy::OnFailure { max_restarts } => {
                    if exit.success() {
                        live -= 1;
                        continue;
                    }
                    let used = self.restarts.get(&exit.ordinal).copied().unwrap_or(0);
                    if used >= max_restarts {
                        warn!(ordinal = exit.ordinal, "restart budget exhausted");
                        live -= 1;
                        continue;
                    }
                    let attempt = used + 1;
                    self.restarts.insert(exit.ordinal, attempt);
                    let backoff = restart_backoff(attempt);
                    info!(
                        ordinal = exit.ordinal,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "restarting worker"
                    );
                    tokio::time::sleep(backoff).await;
                    self.launch(exit.ordinal, &exit_tx, &shutdown)?;
                }
            }
        }

        Ok(())
    }

    /// Spawn one worker child and its exit watcher.
    fn launch(
        &self,
        ordinal: usize,
        exit_tx: &mpsc::UnboundedSender<WorkerExit>,
        shutdown: &watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let port = self.config.worker_port(ordinal);
        let mut child = Command::new(&self.worker_bin)
            .arg("worker")
            .arg("--ordinal")
            .arg(ordinal.to_string())
            .env("HOST", &self.config.host)
            .env("PORT", port.to_string())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning worker {ordinal}"))?;

        info!(ordinal, port, pid = ?child.id(), "worker spawned");

        let exit_tx = exit_tx.clone();
        let mut shutdown = shutdown.clone();
        tokio::spawn(async move {
            let exited = tokio::select! {
                status = child.wait() => Some(status),
                _ = shutdown.changed() => None,
            };
            match exited {
                Some(status) => {
                    let _ = exit_tx.send(WorkerExit {
                        ordinal,
                        status: status.ok(),
                    });
                }
                None => {
                    if let Err(e) = child.kill().await {
                        warn!(ordinal, error = %e, "failed to kill worker");
                    }
                }
            }
        });

        Ok(())
    }
}

/// Doubling backoff: 500ms, 1s, 2s, ... capped at 30s.
fn restart_backoff(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(6);
    Duration::from_millis(500 * (1u64 << exp)).min(Duration::from_secs(30))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(restart_backoff(1), Duration::from_millis(500));
        assert_eq!(restart_backoff(2), Duration::from_secs(1));
        assert_eq!(restart_backoff(3), Duration::from_secs(2));
        assert_eq!(restart_backoff(100), Duration::from_secs(30));
    }

    #[test]
    fn worker_exit_success_requires_a_status() {
        let exit = WorkerExit {
            ordinal: 0,
            status: None,
        };
        assert!(!exit.success());
    }

    #[tokio::test]
    async fn missing_binary_fails_launch() {
        let config = FleetConfig {
            size: 1,
            ..FleetConfig::default()
        };
        let supervisor =
            FleetSupervisor::new(config, PathBuf::from("/nonexistent/blockgrid-worker-bin"));
        let (_tx, rx) = watch::channel(false);

        assert!(supervisor.run(rx).await.is_err());
    }

    #[tokio::test]
    async fn supervisor_stops_on_shutdown_signal() {
        // `true` exits immediately, so this also exercises the exit path.
        let config = FleetConfig {
            size: 2,
            ..FleetConfig::default()
        };
        let supervisor = FleetSupervisor::new(config, PathBuf::from("true"));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(supervisor.run(rx));
        tokio::time::sleep(Duration::from_millis(200)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("supervisor did not stop")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn failing_worker_is_relaunched_until_the_budget_is_spent() {
        use std::os::unix::fs::PermissionsExt;

        // Each launch appends a line, then the worker fails.
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("launches");
        let script = dir.path().join("worker.sh");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho run >> {}\nexit 1\n", log.display()),
        )
        .unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let config = FleetConfig {
            size: 1,
            restart: RestartPolicy::OnFailure { max_restarts: 1 },
            ..FleetConfig::default()
        };
        let supervisor = FleetSupervisor::new(config, script);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(supervisor.run(rx));

        let launches = || {
            std::fs::read_to_string(&log)
                .map(|s| s.lines().count())
                .unwrap_or(0)
        };

        // Initial launch, then one relaunch after the 500ms backoff.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while launches() < 2 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        // A relaunch past the budget would arrive after a 1s backoff.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(launches(), 2);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("supervisor did not stop")
            .unwrap()
            .unwrap();
    }
}
