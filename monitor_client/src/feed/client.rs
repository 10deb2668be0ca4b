//! Reconnecting live feed client
//!
//! One `LiveFeedClient` drives at most one session. A session is a
//! background task that owns the socket, decodes inbound frames for the
//! observer and reconnects at a fixed interval until the retry budget is
//! spent. Starting a new session closes the previous one.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use super::message::{action_payload, FeedMessage};
use super::observer::{ChannelObserver, FeedEvent, FeedObserver};
use super::retry::{RetryPolicy, RetryState};
use super::transport::{CloseInfo, Connector, FeedConnection, Frame, TungsteniteConnector};
use crate::{
    config::DashboardConfig, endpoint::BackendEndpoint, resource::ResourceId, DashboardError,
    Result,
};

/// How long a cancelled session waits for a pending handshake before dropping it
const HANDSHAKE_GRACE: Duration = Duration::from_secs(5);

/// Live feed statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedStats {
    /// Resource of the current session
    pub resource: Option<ResourceId>,

    /// Socket currently open
    pub connected: bool,

    /// Consecutive closes since the last successful open
    pub attempt: u32,

    /// Reconnect budget spent; a new `connect` is required
    pub exhausted: bool,

    /// Messages delivered to the observer
    pub messages_received: u64,

    /// Payloads dropped because they were not valid JSON
    pub decode_failures: u64,

    /// Last delivered message timestamp
    pub last_message: Option<DateTime<Utc>>,
}

/// State shared between the client and its running session
#[derive(Debug, Default)]
struct SessionShared {
    retry: Mutex<RetryState>,
    stats: RwLock<FeedStats>,
}

/// Handle on a running session
#[derive(Debug)]
struct SessionHandle {
    resource: ResourceId,
    cancel: CancellationToken,
    actions: mpsc::UnboundedSender<String>,
    shared: Arc<SessionShared>,
    task: JoinHandle<()>,
}

/// Reconnecting WebSocket client for one monitor at a time
pub struct LiveFeedClient {
    id: Uuid,
    endpoint: BackendEndpoint,
    policy: RetryPolicy,
    connector: Arc<dyn Connector>,
    session: Option<SessionHandle>,
}

impl LiveFeedClient {
    /// Create a client using the real WebSocket transport
    pub fn new(endpoint: BackendEndpoint, policy: RetryPolicy) -> Self {
        Self::with_connector(endpoint, policy, Arc::new(TungsteniteConnector))
    }

    /// Create a client with a custom transport
    pub fn with_connector(
        endpoint: BackendEndpoint,
        policy: RetryPolicy,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint,
            policy,
            connector,
            session: None,
        }
    }

    /// Create a client from the loaded configuration
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        Ok(Self::new(
            BackendEndpoint::from_config(config)?,
            config.live_feed.retry_policy(),
        ))
    }

    /// Open the live feed for `resource` and report events to `observer`.
    ///
    /// Fails with [`DashboardError::EmptyResourceId`] before any network
    /// activity when the identifier is empty. Any previous session is
    /// closed first. Must be called from within a tokio runtime.
    pub fn connect<O: FeedObserver>(&mut self, resource: &ResourceId, observer: O) -> Result<()> {
        if resource.is_empty() {
            warn!(client = %self.id, "Refusing to open live feed without a resource identifier");
            return Err(DashboardError::EmptyResourceId);
        }

        let url = self.endpoint.feed_url(resource)?;
        self.close();

        info!(
            client = %self.id,
            resource = %resource,
            url = %url,
            max_attempts = self.policy.max_attempts,
            interval_ms = self.policy.interval.as_millis() as u64,
            "Starting live feed"
        );

        let shared = Arc::new(SessionShared::default());
        shared.stats.write().resource = Some(resource.clone());

        let cancel = CancellationToken::new();
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();

        let session = FeedSession {
            resource: resource.clone(),
            url,
            policy: self.policy,
            connector: Arc::clone(&self.connector),
            observer,
            cancel: cancel.clone(),
            actions: actions_rx,
            shared: Arc::clone(&shared),
        };
        let task = tokio::spawn(session.run());

        self.session = Some(SessionHandle {
            resource: resource.clone(),
            cancel,
            actions: actions_tx,
            shared,
            task,
        });

        Ok(())
    }

    /// Open the live feed and hand back a channel of events
    pub fn subscribe(&mut self, resource: &ResourceId) -> Result<mpsc::UnboundedReceiver<FeedEvent>> {
        let (observer, rx) = ChannelObserver::channel();
        self.connect(resource, observer)?;
        Ok(rx)
    }

    /// Stop the session: cancel a pending retry, close the socket and reset
    /// the retry counter. Safe to call repeatedly or before `connect`.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            info!(client = %self.id, resource = %session.resource, "Closing live feed");
            session.cancel.cancel();
            session.shared.retry.lock().reset();
        }
    }

    /// Send `{"action": ...}` to the backend.
    ///
    /// Queued until the socket is open when a reconnect is in progress.
    pub fn send_action(&self, action: &str) -> Result<()> {
        let session = self.session.as_ref().ok_or_else(|| DashboardError::NotConnected {
            resource: "<none>".to_string(),
        })?;

        if session.task.is_finished() {
            return Err(DashboardError::NotConnected {
                resource: session.resource.to_string(),
            });
        }

        session
            .actions
            .send(action_payload(action))
            .map_err(|_| DashboardError::NotConnected {
                resource: session.resource.to_string(),
            })
    }

    /// Resource of the current session
    pub fn resource(&self) -> Option<&ResourceId> {
        self.session.as_ref().map(|s| &s.resource)
    }

    /// Check if the socket is currently open
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.shared.stats.read().connected)
            .unwrap_or(false)
    }

    /// Snapshot of the current session's statistics
    pub fn stats(&self) -> FeedStats {
        match &self.session {
            Some(session) => {
                let mut stats = session.shared.stats.read().clone();
                let retry = session.shared.retry.lock();
                stats.attempt = retry.attempt();
                stats.exhausted = retry.is_exhausted(&self.policy);
                stats
            }
            None => FeedStats::default(),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

impl Drop for LiveFeedClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for LiveFeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveFeedClient")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("policy", &self.policy)
            .field("session", &self.session)
            .finish()
    }
}

/// Background task owning the socket
struct FeedSession<O> {
    resource: ResourceId,
    url: Url,
    policy: RetryPolicy,
    connector: Arc<dyn Connector>,
    observer: O,
    cancel: CancellationToken,
    actions: mpsc::UnboundedReceiver<String>,
    shared: Arc<SessionShared>,
}

impl<O: FeedObserver> FeedSession<O> {
    async fn run(mut self) {
        loop {
            debug!(resource = %self.resource, url = %self.url, "Opening live feed connection");

            let connected = {
                let mut connecting = self.connector.connect(&self.url);
                tokio::select! {
                    result = &mut connecting => result,
                    _ = self.cancel.cancelled() => {
                        // Let an in-flight handshake finish so the socket closes cleanly
                        if let Ok(Ok(mut connection)) = tokio::time::timeout(HANDSHAKE_GRACE, connecting).await {
                            if let Err(e) = connection.close().await {
                                debug!(resource = %self.resource, error = %e, "Error closing live feed socket");
                            }
                        }
                        return;
                    }
                }
            };

            let close_info = match connected {
                Ok(mut connection) => {
                    // close() raced with the handshake
                    if self.cancel.is_cancelled() {
                        let _ = connection.close().await;
                        return;
                    }

                    self.handle_open();

                    let ended = self.pump(connection.as_mut()).await;
                    if let Err(e) = connection.close().await {
                        debug!(resource = %self.resource, error = %e, "Error closing live feed socket");
                    }

                    match ended {
                        Some(info) => info,
                        None => {
                            self.shared.stats.write().connected = false;
                            return;
                        }
                    }
                }
                Err(e) => {
                    error!(
                        resource = %self.resource,
                        error = %e,
                        category = e.category(),
                        "Live feed connection failed"
                    );
                    CloseInfo::abnormal(e.to_string())
                }
            };

            if self.cancel.is_cancelled() {
                return;
            }

            self.shared.stats.write().connected = false;
            info!(
                resource = %self.resource,
                code = ?close_info.code,
                reason = %close_info.reason,
                "Live feed connection closed"
            );
            self.observer.on_close(&close_info);

            let next = self.shared.retry.lock().record_close(&self.policy);
            let attempt = self.shared.retry.lock().attempt();

            match next {
                Some(delay) => {
                    warn!(
                        resource = %self.resource,
                        attempt = attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Reconnecting live feed in {} ms",
                        delay.as_millis()
                    );
                    metrics::increment_counter!(
                        "live_feed_reconnects_total",
                        "resource" => self.resource.to_string()
                    );

                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => {
                    error!(
                        resource = %self.resource,
                        max_attempts = self.policy.max_attempts,
                        "Live feed retry budget exhausted, giving up until the next connect"
                    );
                    metrics::increment_counter!(
                        "live_feed_retry_exhausted_total",
                        "resource" => self.resource.to_string()
                    );
                    return;
                }
            }
        }
    }

    fn handle_open(&mut self) {
        self.shared.retry.lock().record_open();
        self.shared.stats.write().connected = true;
        info!(resource = %self.resource, "Live feed connection established");
        self.observer.on_open();
    }

    /// Read until the socket ends. `None` means the session was cancelled.
    async fn pump(&mut self, connection: &mut dyn FeedConnection) -> Option<CloseInfo> {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                Some(action) = self.actions.recv() => {
                    debug!(resource = %self.resource, payload = %action, "Sending live feed action");
                    if let Err(e) = connection.send_text(action).await {
                        warn!(resource = %self.resource, error = %e, "Failed to send live feed action");
                    }
                }
                frame = connection.next_frame() => match frame {
                    Some(Ok(Frame::Text(text))) => self.deliver(&text),
                    Some(Ok(Frame::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => self.deliver(&text),
                        Err(e) => self.reject(&e.to_string()),
                    },
                    Some(Ok(Frame::Close(info))) => {
                        return Some(info.unwrap_or_else(|| CloseInfo::abnormal("closed without frame")));
                    }
                    Some(Err(e)) => {
                        error!(resource = %self.resource, error = %e, "Live feed socket error");
                        return Some(CloseInfo::abnormal(e.to_string()));
                    }
                    None => return Some(CloseInfo::abnormal("stream ended")),
                },
            }
        }
    }

    fn deliver(&mut self, payload: &str) {
        if self.cancel.is_cancelled() {
            return;
        }

        match FeedMessage::decode(payload) {
            Ok(message) => {
                {
                    let mut stats = self.shared.stats.write();
                    stats.messages_received += 1;
                    stats.last_message = Some(Utc::now());
                }
                metrics::increment_counter!(
                    "live_feed_messages_total",
                    "resource" => self.resource.to_string()
                );
                self.observer.on_message(message);
            }
            Err(e) => self.reject(&e.to_string()),
        }
    }

    fn reject(&mut self, reason: &str) {
        self.shared.stats.write().decode_failures += 1;
        metrics::increment_counter!(
            "live_feed_decode_failures_total",
            "resource" => self.resource.to_string()
        );
        error!(resource = %self.resource, error = reason, "Dropping malformed live feed message");
    }
}
