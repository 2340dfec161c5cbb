//! Configuration for the hamilton-ingest daemon
//!
//! Loads configuration from a TOML file. Every section and field has a
//! default, so a partial file (or no file at all) yields a runnable setup
//! that listens on the IPv6 wildcard at port 4041.

use crate::error::{Error, Result};
use crate::publish::WireFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// UDP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Socket bind address
    ///
    /// Examples:
    /// - `[::]:4041` - IPv6 wildcard (sensor mesh default)
    /// - `127.0.0.1:4041` - Localhost only, for bench testing
    pub bind_address: String,

    /// Socket read timeout; bounds how long shutdown waits on an idle socket
    pub read_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "[::]:4041".to_string(),
            read_timeout_ms: 100,
        }
    }
}

impl NetworkConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Packet handler pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Number of handler worker threads
    pub workers: usize,
    /// Datagrams waiting for a worker before the listener waits
    pub job_backlog: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            job_backlog: 256,
        }
    }
}

/// Reading queue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Bounded capacity; producers block when full
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 10 }
    }
}

/// Demo generator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DemoConfig {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 2000,
        }
    }
}

impl DemoConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Where published records go
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Log each record (topic and encoded size)
    #[default]
    Log,
    /// Length-prefixed frames on stdout, for an external bridge process
    Stdout,
}

/// Publisher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub sink: SinkKind,
    pub format: WireFormat,
    /// Topic prefix; readings go to `<prefix>/<serial>/accel`
    pub topic_prefix: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::Log,
            format: WireFormat::Json,
            topic_prefix: "hamilton".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it
    ///
    /// # Example
    /// ```no_run
    /// use hamilton_ingest::config::Config;
    ///
    /// let config = Config::load("hamilton-ingest.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject settings that would stall the pipeline
    pub fn validate(&self) -> Result<()> {
        if self.queue.capacity == 0 {
            return Err(Error::Config("queue.capacity must be > 0".to_string()));
        }
        if self.ingest.workers == 0 {
            return Err(Error::Config("ingest.workers must be > 0".to_string()));
        }
        if self.ingest.job_backlog == 0 {
            return Err(Error::Config("ingest.job_backlog must be > 0".to_string()));
        }
        if self.demo.enabled && self.demo.interval_ms == 0 {
            return Err(Error::Config(
                "demo.interval_ms must be > 0 when demo is enabled".to_string(),
            ));
        }
        if self.network.read_timeout_ms == 0 {
            // A zero timeout is rejected by UdpSocket::set_read_timeout
            return Err(Error::Config(
                "network.read_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
