//! Configuration structures for LogTail

use crate::tail::OutputFormat;
use crate::{LogTailError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix of environment variables overriding file settings, e.g. `LOGTAIL__TAIL__BATCH_SIZE`
pub const ENV_PREFIX: &str = "LOGTAIL";

/// Top-level CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Remote service connection
    pub client: ClientConfig,
    /// Live tail settings
    pub tail: TailSettings,
    /// Round-trip probe settings
    pub probe: ProbeSettings,
}

/// Connection to the remote log service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Unix socket the service listens on
    pub socket_path: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
    /// Reconnect on the next request after a failed one
    pub auto_reconnect: bool,
}

/// Live tail poll loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailSettings {
    /// Delay between polls in milliseconds
    pub poll_interval_ms: u64,
    /// Upper bound of the failure backoff in milliseconds
    pub max_backoff_ms: u64,
    /// Maximum records requested per poll
    pub batch_size: u32,
    /// Output format (text, json)
    pub format: String,
}

/// Round-trip probe settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Deadline for the injected record to come back, in seconds
    pub timeout_seconds: u64,
    /// Delay between probe polls in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: "/tmp/logtail.sock".to_string(),
            timeout_seconds: 5,
            auto_reconnect: true,
        }
    }
}

impl Default for TailSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            max_backoff_ms: 8_000,
            batch_size: 100,
            format: "text".to_string(),
        }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            poll_interval_ms: 500,
        }
    }
}

impl TailSettings {
    /// Delay between polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Upper bound of the failure backoff
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl ProbeSettings {
    /// Deadline for the probe
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Delay between probe polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl CliConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LogTailError::Config(format!("Failed to read config file: {}", e)))?;

        let config: CliConfig = toml::from_str(&content)
            .map_err(|e| LogTailError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load defaults, then an optional file, then `LOGTAIL__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: CliConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| LogTailError::Config(format!("Failed to load config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.client.validate()?;
        self.tail.validate()?;
        self.probe.validate()
    }
}

impl ClientConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.socket_path.is_empty() {
            return Err(LogTailError::Config("Socket path cannot be empty".to_string()));
        }
        if self.timeout_seconds == 0 {
            return Err(LogTailError::Config("Request timeout must be positive".to_string()));
        }
        Ok(())
    }
}

impl TailSettings {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(LogTailError::Config("Poll interval must be positive".to_string()));
        }
        if self.max_backoff_ms < self.poll_interval_ms {
            return Err(LogTailError::Config(
                "Maximum backoff cannot be shorter than the poll interval".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(LogTailError::Config("Batch size must be positive".to_string()));
        }
        match OutputFormat::parse(&self.format) {
            Some(_) => Ok(()),
            None => Err(LogTailError::Config(format!(
                "Unknown output format '{}'",
                self.format
            ))),
        }
    }
}

impl ProbeSettings {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.timeout_seconds == 0 {
            return Err(LogTailError::Config("Probe timeout must be positive".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(LogTailError::Config("Probe poll interval must be positive".to_string()));
        }
        Ok(())
    }
}
