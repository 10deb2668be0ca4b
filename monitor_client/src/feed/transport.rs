//! Socket abstraction for the live feed
//!
//! The session loop only needs three things from a socket: read the next
//! frame, send a text frame, close. `Connector` produces such sockets so the
//! reconnect logic can run against a real WebSocket or a scripted stand-in.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{protocol::CloseFrame, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::debug;
use url::Url;

use crate::Result;

/// Why a connection ended
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseInfo {
    /// WebSocket close code, absent when the socket dropped without one
    pub code: Option<u16>,

    /// Close reason or error description
    pub reason: String,
}

impl CloseInfo {
    pub fn new<S: Into<String>>(code: u16, reason: S) -> Self {
        Self {
            code: Some(code),
            reason: reason.into(),
        }
    }

    /// Ended without a close handshake
    pub fn abnormal<S: Into<String>>(reason: S) -> Self {
        Self {
            code: None,
            reason: reason.into(),
        }
    }
}

impl From<CloseFrame<'_>> for CloseInfo {
    fn from(frame: CloseFrame<'_>) -> Self {
        Self::new(u16::from(frame.code), frame.reason.into_owned())
    }
}

/// Data-bearing frames surfaced to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Close(Option<CloseInfo>),
}

/// One open socket
#[async_trait]
pub trait FeedConnection: Send {
    /// Next frame; `None` once the stream has ended
    async fn next_frame(&mut self) -> Option<Result<Frame>>;

    /// Send a text frame
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Close the socket, ignoring an already-closed peer
    async fn close(&mut self) -> Result<()>;
}

/// Opens sockets for the session loop
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &Url) -> Result<Box<dyn FeedConnection>>;
}

/// `tokio-tungstenite` backed connector
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn FeedConnection>> {
        let (stream, response) = connect_async(url.as_str()).await?;
        debug!(url = %url, status = %response.status(), "WebSocket handshake completed");
        Ok(Box::new(TungsteniteConnection { stream }))
    }
}

struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedConnection for TungsteniteConnection {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        loop {
            let frame = match self.stream.next().await? {
                Ok(Message::Text(text)) => Frame::Text(text),
                Ok(Message::Binary(data)) => Frame::Binary(data),
                Ok(Message::Close(frame)) => Frame::Close(frame.map(CloseInfo::from)),
                // Control frames are answered by tungstenite itself
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => continue,
                Err(e) => return Some(Err(e.into())),
            };
            return Some(Ok(frame));
        }
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
