//! Delivery of live feed events to their owner

use tokio::sync::mpsc;

use super::message::FeedMessage;
use super::transport::CloseInfo;

/// Receives events from one live feed session
///
/// Callbacks run on the session task, one at a time. Messages that arrive
/// after `close` are dropped before they reach the observer.
pub trait FeedObserver: Send + 'static {
    /// A decoded message arrived
    fn on_message(&mut self, message: FeedMessage);

    /// The socket opened and the retry budget was restored
    fn on_open(&mut self) {}

    /// The socket closed or could not be opened
    fn on_close(&mut self, _info: &CloseInfo) {}
}

/// Events forwarded by [`ChannelObserver`]
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Opened,
    Message(FeedMessage),
    Closed(CloseInfo),
}

/// Forwards every event into a channel the owner drains
///
/// The receiver sees the channel end once the session finishes, either after
/// `close` or when the retry budget runs out.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<FeedEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<FeedEvent>) -> Self {
        Self { tx }
    }

    /// Observer plus the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FeedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl FeedObserver for ChannelObserver {
    fn on_message(&mut self, message: FeedMessage) {
        // Receiver dropped means nobody is listening any more
        let _ = self.tx.send(FeedEvent::Message(message));
    }

    fn on_open(&mut self) {
        let _ = self.tx.send(FeedEvent::Opened);
    }

    fn on_close(&mut self, info: &CloseInfo) {
        let _ = self.tx.send(FeedEvent::Closed(info.clone()));
    }
}

type CloseCallback = Box<dyn FnMut(&CloseInfo) + Send>;

/// Closure-based observer: a message callback and an optional close callback
pub struct CallbackObserver<M> {
    on_message: M,
    on_close: Option<CloseCallback>,
}

impl<M> CallbackObserver<M>
where
    M: FnMut(FeedMessage) + Send + 'static,
{
    pub fn new(on_message: M) -> Self {
        Self {
            on_message,
            on_close: None,
        }
    }

    /// Also call `on_close` whenever the connection ends
    pub fn with_close<C>(mut self, on_close: C) -> Self
    where
        C: FnMut(&CloseInfo) + Send + 'static,
    {
        self.on_close = Some(Box::new(on_close));
        self
    }
}

impl<M> FeedObserver for CallbackObserver<M>
where
    M: FnMut(FeedMessage) + Send + 'static,
{
    fn on_message(&mut self, message: FeedMessage) {
        (self.on_message)(message);
    }

    fn on_close(&mut self, info: &CloseInfo) {
        if let Some(on_close) = self.on_close.as_mut() {
            on_close(info);
        }
    }
}
