//! Configuration loading for the `taskwheel-broker` and `taskwheel-worker`
//! binaries.
//!
//! Both binaries are started with a single `-config <path>` flag pointing
//! at a TOML file; there is no multi-source merge (environment overrides,
//! XDG search paths, etc.) here — just one file, read once at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Broker startup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// `host:port` to bind the client-facing TCP listener on.
    pub addr: String,
    /// `host:port[/dbnum]` of the store backend.
    pub redis: String,
    pub log_path: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Worker startup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// `host:port` of the broker (reserved for future worker→broker
    /// signaling; the worker currently talks to the store directly).
    pub broker: String,
    /// `host:port[/dbnum]` of the store backend.
    pub redis: String,
    pub log_path: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Root directory executables are resolved under.
    pub bin_path: PathBuf,
    /// Seconds to sleep between consumer loop iterations when `> 0`.
    #[serde(default)]
    pub period: u64,
    /// TTL, in seconds, applied to a written result record.
    pub result_keep_time: u64,
    /// Hard wall-clock limit, in seconds, on a single task execution.
    pub task_run_time: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BrokerConfig {
    /// Build the `redis://` connection URL `taskwheel-store` expects.
    pub fn redis_url(&self) -> String {
        to_redis_url(&self.redis)
    }
}

impl WorkerConfig {
    pub fn redis_url(&self) -> String {
        to_redis_url(&self.redis)
    }
}

fn to_redis_url(redis: &str) -> String {
    if redis.starts_with("redis://") || redis.starts_with("rediss://") {
        redis.to_string()
    } else {
        format!("redis://{redis}")
    }
}

fn read_to_string(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_broker_config(path: &Path) -> Result<BrokerConfig, ConfigError> {
    let text = read_to_string(path)?;
    toml::from_str(&text).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

pub fn load_worker_config(path: &Path) -> Result<WorkerConfig, ConfigError> {
    let text = read_to_string(path)?;
    toml::from_str(&text).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
