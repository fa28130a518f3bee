//! blockgrid.toml configuration.
//!
//! Three sections: `[fleet]` for the worker supervisor, `[dispatch]` for
//! the client pool, `[api]` for the REST front door. Every field has a
//! default, so a missing file or empty section is valid. Environment
//! overrides (`HOST`, `PORT`) are applied by the daemon, not here, so
//! library code stays hermetic.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Worker restart behavior after a child process exits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Log the exit and leave the ordinal vacant.
    Never,
    /// Respawn the same ordinal with a doubling backoff, up to the cap.
    OnFailure { max_restarts: u32 },
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy::Never
    }
}

/// Configuration for the worker fleet supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Number of worker processes to launch.
    pub size: usize,
    /// Bind host passed to each worker.
    pub host: String,
    /// Worker `i` listens on `base_port + i`.
    pub base_port: u16,
    /// What to do when a worker exits.
    pub restart: RestartPolicy,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            size: 8,
            host: "0.0.0.0".to_string(),
            base_port: 30040,
            restart: RestartPolicy::Never,
        }
    }
}

impl FleetConfig {
    /// Listen port for the worker at `ordinal`, if it stays inside the
    /// port range.
    pub fn checked_worker_port(&self, ordinal: usize) -> Option<u16> {
        u16::try_from(ordinal)
            .ok()
            .and_then(|offset| self.base_port.checked_add(offset))
    }

    /// Listen port for the worker at `ordinal`.
    ///
    /// Saturates at the top of the port range; [`validate`](Self::validate)
    /// rejects configurations where any launched ordinal would.
    pub fn worker_port(&self, ordinal: usize) -> u16 {
        self.checked_worker_port(ordinal).unwrap_or(u16::MAX)
    }

    /// Reject fleets whose last ordinal runs past the end of the port
    /// range.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self
            .checked_worker_port(self.size.saturating_sub(1))
            .is_none()
        {
            anyhow::bail!(
                "a fleet of {} from base port {} runs past the end of the port range",
                self.size,
                self.base_port
            );
        }
        Ok(())
    }
}

/// Configuration for the dispatch layer (client pool + sizing).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Per-request time budget in milliseconds. Drives pool sizing only;
    /// never enforced as an RPC timeout.
    pub deadline_ms: f64,
    /// Modeled number of multiplicative calls per request.
    pub calls_per_request: u32,
    /// Hard cap on pool entries.
    pub max_pool_size: usize,
    /// Host the workers are reachable on.
    pub worker_host: String,
    /// Worker `i` is dialed at `worker_base_port + i`.
    pub worker_base_port: u16,
    /// Pin every ordinal to one port (set from the `PORT` environment
    /// override by the daemon).
    pub worker_port_override: Option<u16>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 50.0,
            calls_per_request: 7,
            max_pool_size: 8,
            worker_host: "0.0.0.0".to_string(),
            worker_base_port: 30040,
            worker_port_override: None,
        }
    }
}

impl DispatchConfig {
    /// Dial port for the worker at `ordinal`, if it stays inside the
    /// port range. An override pins every ordinal, so it always fits.
    pub fn checked_worker_port(&self, ordinal: usize) -> Option<u16> {
        match self.worker_port_override {
            Some(port) => Some(port),
            None => u16::try_from(ordinal)
                .ok()
                .and_then(|offset| self.worker_base_port.checked_add(offset)),
        }
    }

    /// Dial port for the worker at `ordinal`.
    ///
    /// Saturates at the top of the port range; [`validate`](Self::validate)
    /// rejects configurations where any pool entry would.
    pub fn worker_port(&self, ordinal: usize) -> u16 {
        self.checked_worker_port(ordinal).unwrap_or(u16::MAX)
    }

    /// Full endpoint URI for the worker at `ordinal`.
    pub fn worker_endpoint(&self, ordinal: usize) -> String {
        format!("http://{}:{}", self.worker_host, self.worker_port(ordinal))
    }

    /// Reject pools whose last entry would dial past the end of the
    /// port range.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self
            .checked_worker_port(self.max_pool_size.saturating_sub(1))
            .is_none()
        {
            anyhow::bail!(
                "a pool of {} from base port {} runs past the end of the port range",
                self.max_pool_size,
                self.worker_base_port
            );
        }
        Ok(())
    }
}

/// Configuration for the REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Port the REST listener binds.
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Top-level configuration, usually loaded from `blockgrid.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockgridConfig {
    pub fleet: FleetConfig,
    pub dispatch: DispatchConfig,
    pub api: ApiConfig,
}

impl BlockgridConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BlockgridConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks that serde defaults cannot express. The daemon
    /// re-runs this after merging command-line flags.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.fleet.validate()?;
        self.dispatch.validate()
    }
}
