//! Configuration from environment variables with fallback to defaults.
//!
//! Environment variables:
//! - `API_BASE_URL` - upstream base URL (default `http://localhost:8000`)
//! - `API_TIMEOUT` - per-attempt deadline in ms
//! - `API_MAX_RETRIES` - total attempts per request
//! - `API_RETRY_DELAY` - base backoff delay in ms
//! - `RATE_LIMIT_WINDOW_MS`, `RATE_LIMIT_MAX` - project creation budget
//! - `TASKGATE_HOST`, `TASKGATE_PORT` - gateway bind address
//! - `LOG_LEVEL` - default tracing filter

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::client::RetryPolicy;
use crate::client::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT};
use crate::rate_limit::{DEFAULT_SWEEP_INTERVAL, RateLimitConfig};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Timeouts below this are accepted but logged.
const LOW_TIMEOUT_MS: u64 = 1_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API_BASE_URL is required")]
    MissingBaseUrl,

    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("rate limit max must be at least 1")]
    ZeroRateLimit,

    #[error("invalid bind address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },
}

/// Upstream client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("API_BASE_URL").unwrap_or(defaults.base_url),
            timeout_ms: number(&lookup, "API_TIMEOUT", defaults.timeout_ms),
            max_attempts: number(&lookup, "API_MAX_RETRIES", defaults.max_attempts),
            base_delay_ms: number(&lookup, "API_RETRY_DELAY", defaults.base_delay_ms),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.timeout_ms < LOW_TIMEOUT_MS {
            warn!(
                timeout_ms = self.timeout_ms,
                "API_TIMEOUT is below 1000ms, expect frequent timeouts"
            );
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.timeout_ms),
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
        )
    }
}

/// Gateway settings: bind address, route budgets and the upstream client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub client: ClientConfig,

    /// Budget of `POST /api/projects`; tasks use the fixed presets below.
    pub rate_limit: RateLimitConfig,
    pub creation_limit: RateLimitConfig,
    pub completion_limit: RateLimitConfig,
    pub sweep_interval_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            client: ClientConfig::default(),
            rate_limit: RateLimitConfig::default(),
            creation_limit: RateLimitConfig::creation(),
            completion_limit: RateLimitConfig::completion(),
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL.as_millis() as u64,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("TASKGATE_HOST").unwrap_or(defaults.host),
            port: number(&lookup, "TASKGATE_PORT", defaults.port),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            client: ClientConfig::from_lookup(&lookup),
            rate_limit: RateLimitConfig::new(
                number(&lookup, "RATE_LIMIT_WINDOW_MS", defaults.rate_limit.window_ms),
                number(&lookup, "RATE_LIMIT_MAX", defaults.rate_limit.max),
            ),
            ..defaults
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.client.validate()?;
        let budgets = [self.rate_limit, self.creation_limit, self.completion_limit];
        if budgets.iter().any(|b| b.max == 0) {
            return Err(ConfigError::ZeroRateLimit);
        }
        self.socket_addr().map(|_| ())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|e: std::net::AddrParseError| ConfigError::InvalidAddress {
            reason: e.to_string(),
            addr,
        })
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// Parse a numeric variable; unset keeps the fallback silently, garbage keeps it with a warning.
fn number<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, fallback: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => fallback,
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(key, value = %raw, %fallback, "invalid number, using fallback");
                fallback
            }
        },
    }
}
