//! Runtime configuration.
//!
//! Values come from an optional TOML file; every field has a default so an
//! empty file (or no file at all) is valid. CLI flags override file values.

use crate::application::retry::RetryPolicy;
use crate::error::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Checkout retry and deadline settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Attempts per checkout, including the first one.
    pub max_attempts: u32,
    /// Backoff before the first retry, doubled on each further retry.
    pub initial_backoff_ms: u64,
    /// Upper bound for the backoff between two attempts.
    pub max_backoff_ms: u64,
    /// Deadline for a whole checkout call, retries included.
    pub timeout_ms: u64,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 5,
            max_backoff_ms: 200,
            timeout_ms: 5_000,
        }
    }
}

impl CheckoutConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.initial_backoff_ms),
            max_delay: Duration::from_millis(self.max_backoff_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Top-level config file structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub checkout: CheckoutConfig,
}

impl Config {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
