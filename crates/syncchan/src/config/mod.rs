//! Channel configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Example
//!
//! ```rust,ignore
//! use syncchan::ChannelConfig;
//!
//! // Defaults with env overrides
//! let config = ChannelConfig::from_env();
//!
//! // Or customize programmatically
//! let config = ChannelConfig::new()
//!     .capacity(16)
//!     .request_timeout(Duration::from_secs(2));
//! ```

pub mod defaults;

use std::time::Duration;

use syncchan_core::env::{env_get, env_get_opt};

/// Per-channel configuration with builder pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Queue capacity; producers block while this many requests are pending
    pub capacity: usize,
    /// Park slice for blocked producers
    pub park_interval: Duration,
    /// Deadline applied by `Channel::request`; `None` waits forever
    pub request_timeout: Option<Duration>,
    /// Worker thread name prefix
    pub thread_prefix: String,
    /// Worker stack size; `None` uses the platform default
    pub stack_size: Option<usize>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ChannelConfig {
    /// Create config from defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `SYNCCHAN_CAPACITY` - Queue capacity per channel
    /// - `SYNCCHAN_PARK_INTERVAL_MS` - Park slice in milliseconds
    /// - `SYNCCHAN_REQUEST_TIMEOUT_MS` - Default request timeout, 0 = none
    /// - `SYNCCHAN_THREAD_PREFIX` - Worker thread name prefix
    /// - `SYNCCHAN_STACK_SIZE` - Worker stack size in bytes, 0 = platform default
    pub fn from_env() -> Self {
        let timeout_ms = env_get("SYNCCHAN_REQUEST_TIMEOUT_MS", defaults::REQUEST_TIMEOUT_MS);
        let stack_size = env_get("SYNCCHAN_STACK_SIZE", defaults::STACK_SIZE);

        Self {
            capacity: env_get("SYNCCHAN_CAPACITY", defaults::CAPACITY),
            park_interval: Duration::from_millis(env_get(
                "SYNCCHAN_PARK_INTERVAL_MS",
                defaults::PARK_INTERVAL_MS,
            )),
            request_timeout: millis_or_none(timeout_ms),
            thread_prefix: env_get_opt("SYNCCHAN_THREAD_PREFIX")
                .unwrap_or_else(|| defaults::THREAD_PREFIX.to_string()),
            stack_size: (stack_size > 0).then_some(stack_size),
        }
    }

    /// Create config with library defaults (no env override).
    pub fn new() -> Self {
        Self {
            capacity: defaults::CAPACITY,
            park_interval: Duration::from_millis(defaults::PARK_INTERVAL_MS),
            request_timeout: millis_or_none(defaults::REQUEST_TIMEOUT_MS),
            thread_prefix: defaults::THREAD_PREFIX.to_string(),
            stack_size: (defaults::STACK_SIZE > 0).then_some(defaults::STACK_SIZE),
        }
    }

    // Builder methods

    pub fn capacity(mut self, n: usize) -> Self {
        self.capacity = n;
        self
    }

    pub fn park_interval(mut self, d: Duration) -> Self {
        self.park_interval = d;
        self
    }

    /// Accepts a `Duration` or `None`
    pub fn request_timeout(mut self, d: impl Into<Option<Duration>>) -> Self {
        self.request_timeout = d.into();
        self
    }

    pub fn thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidValue("capacity must be > 0"));
        }
        if self.park_interval.is_zero() {
            return Err(ConfigError::InvalidValue("park_interval must be > 0"));
        }
        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidValue("request_timeout must be > 0 when set"));
        }
        if self.thread_prefix.is_empty() {
            return Err(ConfigError::InvalidValue("thread_prefix must not be empty"));
        }
        if self.thread_prefix.contains('\0') {
            return Err(ConfigError::InvalidValue("thread_prefix must not contain NUL"));
        }
        if self.stack_size.is_some_and(|s| s < defaults::MIN_STACK_SIZE) {
            return Err(ConfigError::InvalidValue("stack_size must be >= 64KB"));
        }
        Ok(())
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        eprintln!("syncchan channel configuration:");
        eprintln!("  capacity:         {}", self.capacity);
        eprintln!("  park_interval:    {:?}", self.park_interval);
        eprintln!("  request_timeout:  {:?}", self.request_timeout);
        eprintln!("  thread_prefix:    {}", self.thread_prefix);
        eprintln!("  stack_size:       {:?}", self.stack_size);
    }
}

fn millis_or_none(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChannelConfig::new();
        assert_eq!(config.capacity, 200);
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.stack_size, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env() {
        let config = ChannelConfig::from_env();
        assert!(config.capacity >= 1);
        assert!(!config.thread_prefix.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = ChannelConfig::new()
            .capacity(5)
            .request_timeout(Duration::from_millis(250))
            .thread_prefix("svc")
            .stack_size(256 * 1024);

        assert_eq!(config.capacity, 5);
        assert_eq!(config.request_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.thread_prefix, "svc");
        assert_eq!(config.stack_size, Some(256 * 1024));
        assert!(config.validate().is_ok());

        let config = config.request_timeout(None);
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn test_validation() {
        assert!(ChannelConfig::new().capacity(0).validate().is_err());
        assert!(ChannelConfig::new().park_interval(Duration::ZERO).validate().is_err());
        assert!(ChannelConfig::new().thread_prefix("").validate().is_err());
        assert!(ChannelConfig::new().stack_size(1024).validate().is_err());

        let err = ChannelConfig::new()
            .request_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid config: request_timeout must be > 0 when set");
    }
}
