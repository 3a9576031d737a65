//! Configuration management for the Wanderlust host.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use wanderlust_core::environment::{SystemClock, SystemIdGenerator};

use crate::persistence::FileStorage;
use crate::reducer::AppEnvironment;

/// Directory for the JSON files
pub const DATA_DIR_VAR: &str = "WANDERLUST_DATA_DIR";
/// Coupon check delay in milliseconds
pub const COUPON_CHECK_DELAY_VAR: &str = "WANDERLUST_COUPON_CHECK_DELAY_MS";
/// Coupon modal auto-close delay in milliseconds
pub const COUPON_AUTO_CLOSE_VAR: &str = "WANDERLUST_COUPON_AUTO_CLOSE_MS";
/// Log filter directive
pub const LOG_FILTER_VAR: &str = "RUST_LOG";

/// Errors raised while reading configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("invalid value for {key}: `{value}`")]
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Where [`FileStorage`] keeps its files (default: `.wanderlust`)
    pub data_dir: PathBuf,
    /// Simulated coupon check latency in milliseconds (default: 800)
    pub coupon_check_delay_ms: u64,
    /// Delay before a successful coupon closes the modal (default: 1500)
    pub coupon_auto_close_ms: u64,
    /// `tracing` filter used when `RUST_LOG` is unset (default: info)
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".wanderlust"),
            coupon_check_delay_ms: 800,
            coupon_auto_close_ms: 1500,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a delay is set but not a
    /// whole number of milliseconds.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for
    /// unset variables
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a delay is set but not a
    /// whole number of milliseconds.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let millis = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            lookup(key).map_or(Ok(default), |value| {
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue { key, value })
            })
        };

        Ok(Self {
            data_dir: lookup(DATA_DIR_VAR).map_or(defaults.data_dir, PathBuf::from),
            coupon_check_delay_ms: millis(COUPON_CHECK_DELAY_VAR, defaults.coupon_check_delay_ms)?,
            coupon_auto_close_ms: millis(COUPON_AUTO_CLOSE_VAR, defaults.coupon_auto_close_ms)?,
            log_filter: lookup(LOG_FILTER_VAR).unwrap_or(defaults.log_filter),
        })
    }

    /// Coupon check delay
    #[must_use]
    pub const fn coupon_check_delay(&self) -> Duration {
        Duration::from_millis(self.coupon_check_delay_ms)
    }

    /// Coupon modal auto-close delay
    #[must_use]
    pub const fn coupon_auto_close_delay(&self) -> Duration {
        Duration::from_millis(self.coupon_auto_close_ms)
    }

    /// Production environment: wall clock, timestamp ids and file storage
    /// under `data_dir`
    #[must_use]
    pub fn environment(&self) -> AppEnvironment {
        AppEnvironment::new(
            Arc::new(SystemClock),
            Arc::new(FileStorage::new(self.data_dir.clone())),
            Arc::new(SystemIdGenerator::new()),
        )
        .with_coupon_delays(self.coupon_check_delay(), self.coupon_auto_close_delay())
    }
}
