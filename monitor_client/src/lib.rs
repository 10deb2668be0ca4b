//! # Monitor Client
//!
//! Client side of the workstation health monitor. Wraps the backend's REST
//! API and keeps a reconnecting live feed open to one monitor at a time.

pub mod api;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod feed;
pub mod resource;

pub use api::MonitorApi;
pub use config::DashboardConfig;
pub use endpoint::BackendEndpoint;
pub use error::{DashboardError, Result};
pub use feed::{FeedEvent, FeedMessage, FeedObserver, LiveFeedClient, RetryPolicy};
pub use resource::ResourceId;

/// Current version of the monitor client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Client identifier used in logs
pub const SYSTEM_NAME: &str = "monitor-client";
