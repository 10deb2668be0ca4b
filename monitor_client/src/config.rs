//! Configuration management for the monitor client

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::feed::RetryPolicy;
use crate::resource::{is_valid_placeholder, DEFAULT_PLACEHOLDER};

/// Main configuration structure for the monitor client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Global settings
    pub global: GlobalConfig,

    /// Backend connection settings
    pub backend: BackendConfig,

    /// Live feed settings
    pub live_feed: LiveFeedConfig,
}

/// Global client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Log level
    pub log_level: String,
}

/// Where the monitor backend lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Scheme for REST calls (`http` or `https`)
    pub http_scheme: String,

    /// Scheme for the live feed (`ws` or `wss`)
    pub ws_scheme: String,

    /// Host and optional port, e.g. `localhost:8000`
    pub host: String,

    /// Path prefix in front of `/monitor`, empty when served at the root
    pub api_prefix: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Live feed reconnection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveFeedConfig {
    /// Consecutive reconnect attempts before giving up
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds
    pub retry_interval_ms: u64,

    /// Character substituted for `/` and `:` in resource identifiers
    pub placeholder: char,
}

impl LiveFeedConfig {
    /// Retry policy described by this section
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_interval_ms))
    }
}

impl BackendConfig {
    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl DashboardConfig {
    /// Load configuration from files and environment
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from("config/dashboard")
    }

    /// Load configuration layered on top of `base` (a path without extension)
    pub fn load_from(base: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::with_name(base).required(false))
            // Add environment-specific config
            .add_source(File::with_name(&format!(
                "{}-{}",
                base,
                std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
            )).required(false))
            // Add local config (gitignored)
            .add_source(File::with_name(&format!("{}-local", base)).required(false))
            // Add environment variables with DASHBOARD__ prefix
            .add_source(Environment::with_prefix("DASHBOARD").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.backend.host.trim().is_empty() {
            return Err(ConfigError::Message("backend.host must not be empty".into()));
        }

        for (name, scheme) in [
            ("http_scheme", &self.backend.http_scheme),
            ("ws_scheme", &self.backend.ws_scheme),
        ] {
            let probe = format!("{}://{}/", scheme, self.backend.host);
            if Url::parse(&probe).is_err() {
                return Err(ConfigError::Message(format!(
                    "Invalid backend.{} / backend.host combination: {}",
                    name, probe
                )));
            }
        }

        if !matches!(self.backend.ws_scheme.as_str(), "ws" | "wss") {
            return Err(ConfigError::Message(format!(
                "backend.ws_scheme must be ws or wss, got {}",
                self.backend.ws_scheme
            )));
        }

        if self.live_feed.retry_interval_ms == 0 {
            return Err(ConfigError::Message(
                "live_feed.retry_interval_ms must be greater than 0".into(),
            ));
        }

        if !is_valid_placeholder(self.live_feed.placeholder) {
            return Err(ConfigError::Message(format!(
                "live_feed.placeholder must not be a path delimiter: {:?}",
                self.live_feed.placeholder
            )));
        }

        Ok(())
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig {
                log_level: "info".to_string(),
            },
            backend: BackendConfig {
                http_scheme: "http".to_string(),
                ws_scheme: "ws".to_string(),
                host: "localhost:8000".to_string(),
                api_prefix: String::new(),
                request_timeout_seconds: 10,
            },
            live_feed: LiveFeedConfig {
                max_attempts: 5,
                retry_interval_ms: 3000,
                placeholder: DEFAULT_PLACEHOLDER,
            },
        }
    }
}
