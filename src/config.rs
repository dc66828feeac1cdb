//! TOML configuration for the debuglog server
//!
//! Every section is optional:
//!
//! ```toml
//! [server]
//! listen = "127.0.0.1:17070"
//! log_dir = "/var/log/juju"
//! log_file = "all-machines.log"
//! max_request_bytes = 8192
//!
//! [tail]
//! poll_interval_ms = 250
//! follow = true
//!
//! [log]
//! level = "info"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use debuglog_stream::{DEFAULT_POLL_INTERVAL, TailerConfig};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    fn invalid_value(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub tail: TailConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the stream listener binds to
    pub listen: String,

    /// Directory holding the aggregated log file
    pub log_dir: PathBuf,

    /// Name of the log file inside `log_dir`
    pub log_file: String,

    /// Longest accepted request line
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:17070".to_string(),
            log_dir: PathBuf::from("/var/log/juju"),
            log_file: "all-machines.log".to_string(),
            max_request_bytes: 8192,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TailConfig {
    pub poll_interval_ms: u64,
    pub follow: bool,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            follow: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter for the process's own diagnostics (overridden by `RUST_LOG`)
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_str(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.log_file.is_empty() {
            return Err(ConfigError::invalid_value("server.log_file", "must not be empty"));
        }
        if self.server.max_request_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_request_bytes",
                "must be greater than 0",
            ));
        }
        if self.tail.poll_interval_ms == 0 {
            return Err(ConfigError::invalid_value(
                "tail.poll_interval_ms",
                "must be greater than 0",
            ));
        }
        if !matches!(
            self.log.level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::invalid_value(
                "log.level",
                format!("{:?} is not one of trace, debug, info, warn, error", self.log.level),
            ));
        }
        Ok(())
    }

    /// Full path of the streamed log file
    pub fn log_path(&self) -> PathBuf {
        self.server.log_dir.join(&self.server.log_file)
    }

    pub fn tailer_config(&self) -> TailerConfig {
        TailerConfig {
            poll_interval: Duration::from_millis(self.tail.poll_interval_ms),
            follow: self.tail.follow,
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
