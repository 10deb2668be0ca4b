//! Test utilities and helpers
//!
//! A scripted `Connector` whose connection attempts follow a queue of
//! outcomes, and a recording observer.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use monitor_client::feed::{CloseInfo, Connector, FeedConnection, FeedMessage, FeedObserver, Frame};
use monitor_client::{BackendEndpoint, DashboardError, Result};

/// Outcome of one connection attempt
#[derive(Debug, Clone)]
pub enum Attempt {
    /// Handshake fails
    Refuse,
    /// Opens, yields the frames, then the stream ends
    Open(Vec<Frame>),
    /// Opens, yields the frames, then stays open
    Hold(Vec<Frame>),
    /// Handshake takes the given time, then behaves like `Hold`
    Slow(Duration, Vec<Frame>),
}

/// Shared record of what the connector saw
#[derive(Debug, Default)]
pub struct ConnectorLog {
    pub attempts: AtomicUsize,
    pub closed: AtomicUsize,
    pub urls: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<String>>,
}

/// Connector following a script; refuses once the script runs out
#[derive(Debug, Clone)]
pub struct ScriptedConnector {
    script: Arc<Mutex<VecDeque<Attempt>>>,
    pub log: Arc<ConnectorLog>,
}

impl ScriptedConnector {
    pub fn new(script: Vec<Attempt>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            log: Arc::new(ConnectorLog::default()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.log.attempts.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.log.closed.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<String> {
        self.log.sent.lock().clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn FeedConnection>> {
        self.log.attempts.fetch_add(1, Ordering::SeqCst);
        self.log.urls.lock().push(url.to_string());

        let next = self.script.lock().pop_front().unwrap_or(Attempt::Refuse);
        match next {
            Attempt::Refuse => Err(DashboardError::feed(url.as_str(), "connection refused")),
            Attempt::Open(frames) => Ok(Box::new(ScriptedConnection::new(frames, false, &self.log))),
            Attempt::Hold(frames) => Ok(Box::new(ScriptedConnection::new(frames, true, &self.log))),
            Attempt::Slow(delay, frames) => {
                tokio::time::sleep(delay).await;
                Ok(Box::new(ScriptedConnection::new(frames, true, &self.log)))
            }
        }
    }
}

struct ScriptedConnection {
    frames: VecDeque<Frame>,
    hold: bool,
    log: Arc<ConnectorLog>,
}

impl ScriptedConnection {
    fn new(frames: Vec<Frame>, hold: bool, log: &Arc<ConnectorLog>) -> Self {
        Self {
            frames: frames.into(),
            hold,
            log: Arc::clone(log),
        }
    }
}

#[async_trait]
impl FeedConnection for ScriptedConnection {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        if let Some(frame) = self.frames.pop_front() {
            return Some(Ok(frame));
        }
        if self.hold {
            std::future::pending::<()>().await;
        }
        None
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        self.log.sent.lock().push(text);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Observer that records everything it is told
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub messages: Arc<Mutex<Vec<FeedMessage>>>,
    pub opens: Arc<AtomicUsize>,
    pub closes: Arc<Mutex<Vec<CloseInfo>>>,
}

impl RecordingObserver {
    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.lock().len()
    }
}

impl FeedObserver for RecordingObserver {
    fn on_message(&mut self, message: FeedMessage) {
        self.messages.lock().push(message);
    }

    fn on_open(&mut self) {
        self.opens.fetch_add(1, Ordering::SeqCst);
    }

    fn on_close(&mut self, info: &CloseInfo) {
        self.closes.lock().push(info.clone());
    }
}

/// Endpoint pointing at a host nothing listens on
pub fn test_endpoint() -> BackendEndpoint {
    BackendEndpoint::new("http", "ws", "monitor.test:8000", "", ',').unwrap()
}

pub fn status_frame(camera: &str) -> Frame {
    Frame::Text(format!(
        r#"{{"timestamp":1700000000,"camera_ip":"{}","person_detected":true,"cup_detected":false}}"#,
        camera
    ))
}
