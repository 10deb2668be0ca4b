//! Error types for the monitor client

use thiserror::Error;

/// Result type alias for monitor client operations
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Error types for monitor client operations
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Resource identifier is empty")]
    EmptyResourceId,

    #[error("Invalid resource placeholder: {0:?}")]
    InvalidPlaceholder(char),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error: HTTP {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Live feed error: {resource} - {message}")]
    Feed { resource: String, message: String },

    #[error("Live feed not connected: {resource}")]
    NotConnected { resource: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DashboardError {
    /// Create a new API error
    pub fn api<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a new live feed error
    pub fn feed<S: Into<String>>(resource: S, message: S) -> Self {
        Self::Feed {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            DashboardError::Network(_) => true,
            DashboardError::WebSocket(_) => true,
            DashboardError::Io(_) => true,
            DashboardError::Feed { .. } => true,
            DashboardError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get the error category for metrics and log fields
    pub fn category(&self) -> &'static str {
        match self {
            DashboardError::EmptyResourceId => "validation",
            DashboardError::InvalidPlaceholder(_) => "validation",
            DashboardError::Validation(_) => "validation",
            DashboardError::Config(_) => "config",
            DashboardError::Network(_) => "network",
            DashboardError::WebSocket(_) => "network",
            DashboardError::Serialization(_) => "serialization",
            DashboardError::Url(_) => "validation",
            DashboardError::Io(_) => "io",
            DashboardError::Api { .. } => "api",
            DashboardError::Feed { .. } => "feed",
            DashboardError::NotConnected { .. } => "feed",
            DashboardError::Internal(_) => "internal",
        }
    }
}
