//! Configuration for bounded execution
//!
//! [`ExecutorConfig`] is the in-memory form used by the executor. [`RunConfig`]
//! is the on-disk TOML shape, which additionally carries the argument vector:
//!
//! ```toml
//! command = ["/usr/bin/java", "-cp", "out", "MainKt"]
//! timeout_ms = 10000
//! max_output_size = 1048576
//! join_grace_ms = 10000
//!
//! [messages]
//! timeout = "Program was terminated because it exceeded the time limit."
//! long_output = "Program produced too much output and was terminated."
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ExecError;

/// Default wall-clock limit for a single execution (10 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cap on accumulated, escaped stdout (1 MiB)
pub const DEFAULT_MAX_OUTPUT_SIZE: usize = 1024 * 1024;

/// Default time to wait for collectors after the process has ended
pub const DEFAULT_JOIN_GRACE: Duration = Duration::from_secs(10);

/// Default granularity of the process exit poll
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Fixed bodies reported for the two abnormal outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub timeout: String,
    pub long_output: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            timeout: "Program was terminated because it exceeded the time limit.".to_string(),
            long_output: "Program produced too much output and was terminated.".to_string(),
        }
    }
}

/// Limits and messages for the executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Wall-clock limit after which the watchdog terminates the process
    pub timeout: Duration,
    /// Maximum accumulated size of escaped stdout, in bytes
    pub max_output_size: usize,
    /// How long to wait for the stream collectors once the process is gone.
    /// A collector that misses this deadline is abandoned and its thread leaks.
    pub join_grace: Duration,
    pub poll_interval: Duration,
    pub messages: Messages,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_output_size: DEFAULT_MAX_OUTPUT_SIZE,
            join_grace: DEFAULT_JOIN_GRACE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            messages: Messages::default(),
        }
    }
}

impl ExecutorConfig {
    /// Create a configuration with the given timeout and output cap
    pub fn new(timeout: Duration, max_output_size: usize) -> Self {
        Self {
            timeout,
            max_output_size,
            ..Self::default()
        }
    }

    pub fn with_join_grace(mut self, join_grace: Duration) -> Self {
        self.join_grace = join_grace;
        self
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    /// Reject limits that would make every execution fail immediately
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.timeout.is_zero() {
            return Err(ExecError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_output_size == 0 {
            return Err(ExecError::InvalidConfig(
                "max_output_size must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ExecError::InvalidConfig(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// On-disk configuration: the argument vector plus the executor limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Program path followed by its arguments
    pub command: Vec<String>,
    pub timeout_ms: u64,
    pub max_output_size: usize,
    pub join_grace_ms: u64,
    pub poll_interval_ms: u64,
    pub messages: Messages,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            max_output_size: DEFAULT_MAX_OUTPUT_SIZE,
            join_grace_ms: DEFAULT_JOIN_GRACE.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            messages: Messages::default(),
        }
    }
}

impl RunConfig {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(content).context("Invalid TOML")?;
        Ok(config)
    }

    /// Convert to the executor's in-memory configuration, validating limits
    pub fn executor_config(&self) -> Result<ExecutorConfig, ExecError> {
        let config = ExecutorConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            max_output_size: self.max_output_size,
            join_grace: Duration::from_millis(self.join_grace_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            messages: self.messages.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}
