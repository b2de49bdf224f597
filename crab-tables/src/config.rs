//! Engine configuration
//!
//! # Environment variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | TABLE_STORE_URL | http://localhost:3000 | Table store base URL |
//! | TABLE_STORE_TOKEN | (unset) | Bearer token for the store |
//! | TABLE_STORE_TIMEOUT_SECS | 10 | HTTP timeout (seconds) |
//! | RECONCILE_INTERVAL_MS | 5000 | Reconciliation poll interval |
//! | LIVE_MODE | true | Start with polling enabled |
//! | LOG_LEVEL | info | Log level |
//! | LOG_JSON | false | JSON log format |
//! | LOG_DIR | (unset) | Directory for rolling log files |

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default reconciliation poll interval
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(5);

/// Invalid environment value
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Table engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Table store base URL
    pub store_url: String,
    /// Bearer token sent with every store request
    pub store_token: Option<String>,
    /// Per-request timeout for the store
    pub store_timeout: Duration,
    /// Poll interval of the reconciliation loop
    pub reconcile_interval: Duration,
    /// Whether polling starts enabled
    pub live_mode: bool,
    /// Log level (trace | debug | info | warn | error)
    pub log_level: String,
    /// JSON logs instead of pretty console output
    pub log_json: bool,
    /// Rolling log file directory, console only when absent
    pub log_dir: Option<String>,
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables use their defaults; set but malformed ones are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let timeout_secs: u64 = parse_var(&lookup, "TABLE_STORE_TIMEOUT_SECS")?
            .unwrap_or(defaults.store_timeout.as_secs());
        if timeout_secs == 0 {
            return Err(ConfigError::Zero("TABLE_STORE_TIMEOUT_SECS"));
        }

        let interval_ms: u64 = parse_var(&lookup, "RECONCILE_INTERVAL_MS")?
            .unwrap_or(defaults.reconcile_interval.as_millis() as u64);
        if interval_ms == 0 {
            return Err(ConfigError::Zero("RECONCILE_INTERVAL_MS"));
        }

        Ok(Self {
            store_url: lookup("TABLE_STORE_URL").unwrap_or(defaults.store_url),
            store_token: lookup("TABLE_STORE_TOKEN").filter(|t| !t.is_empty()),
            store_timeout: Duration::from_secs(timeout_secs),
            reconcile_interval: Duration::from_millis(interval_ms),
            live_mode: parse_var(&lookup, "LIVE_MODE")?.unwrap_or(defaults.live_mode),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: parse_var(&lookup, "LOG_JSON")?.unwrap_or(defaults.log_json),
            log_dir: lookup("LOG_DIR").filter(|d| !d.is_empty()),
        })
    }

    /// Set the store URL
    pub fn with_store_url(mut self, url: impl Into<String>) -> Self {
        self.store_url = url.into();
        self
    }

    /// Set the reconciliation interval
    pub fn with_reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }

    /// Set whether polling starts enabled
    pub fn with_live_mode(mut self, live: bool) -> Self {
        self.live_mode = live;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_url: "http://localhost:3000".into(),
            store_token: None,
            store_timeout: Duration::from_secs(10),
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            live_mode: true,
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}
