//! Live feed for a single monitor
//!
//! Opens a WebSocket to `/monitor/<encoded-id>/ws`, decodes the JSON status
//! pushes and reconnects at a fixed interval up to a bounded number of
//! consecutive attempts.

pub mod client;
pub mod message;
pub mod observer;
pub mod retry;
pub mod transport;

// Re-export commonly used types
pub use client::{FeedStats, LiveFeedClient};
pub use message::{FeedMessage, StatusUpdate, Welcome, REFRESH_SUMMARY_ACTION};
pub use observer::{CallbackObserver, ChannelObserver, FeedEvent, FeedObserver};
pub use retry::{RetryPolicy, RetryState};
pub use transport::{CloseInfo, Connector, FeedConnection, Frame, TungsteniteConnector};
