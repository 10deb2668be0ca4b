//! Live feed against a real in-process WebSocket server

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use monitor_client::feed::{FeedEvent, FeedMessage, LiveFeedClient, RetryPolicy, REFRESH_SUMMARY_ACTION};
use monitor_client::{BackendEndpoint, ResourceId};

const CAMERA: &str = "udpserver://0.0.0.0:8099/192.168.10.102";

async fn next_event(rx: &mut tokio::sync::mpsc::UnboundedReceiver<FeedEvent>) -> Option<FeedEvent> {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for live feed event")
}

async fn bind() -> (TcpListener, BackendEndpoint) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = listener.local_addr().unwrap().to_string();
    let endpoint = BackendEndpoint::new("http", "ws", &host, "", ',').unwrap();
    (listener, endpoint)
}

#[tokio::test]
async fn test_live_feed_session() {
    let (listener, endpoint) = bind().await;
    let (path_tx, path_rx) = oneshot::channel();
    let (action_tx, action_rx) = oneshot::channel();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let _ = path_tx.send(req.uri().path().to_string());
            Ok(resp)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback).await.unwrap();

        ws.send(Message::Text(
            r#"{"type":"welcome","message":"connected","timestamp":1700000000.0,"camera_ip":"udpserver://0.0.0.0:8099/192.168.10.102"}"#.into(),
        ))
        .await
        .unwrap();

        // Client action arrives on the same socket
        if let Some(Ok(Message::Text(text))) = ws.next().await {
            let _ = action_tx.send(text);
        }

        ws.send(Message::Text("{broken".into())).await.unwrap();
        ws.send(Message::Text(
            r#"{"timestamp":1700000001,"camera_ip":"cam","person_detected":false,"cup_detected":true,"water_intake_message":"cup detected"}"#.into(),
        ))
        .await
        .unwrap();

        ws.close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "bye".into(),
        }))
        .await
        .unwrap();

        // Drain until the client acknowledges the close
        while let Some(Ok(_)) = ws.next().await {}
    });

    let mut feed = LiveFeedClient::new(endpoint, RetryPolicy::new(0, Duration::from_millis(50)));
    let mut events = feed.subscribe(&ResourceId::new(CAMERA)).unwrap();

    assert_eq!(next_event(&mut events).await, Some(FeedEvent::Opened));
    assert_eq!(path_rx.await.unwrap(), "/monitor/udpserver,,,0.0.0.0,8099,192.168.10.102/ws");

    match next_event(&mut events).await {
        Some(FeedEvent::Message(FeedMessage::Welcome(welcome))) => assert_eq!(welcome.camera_ip, CAMERA),
        other => panic!("expected welcome, got {:?}", other),
    }

    feed.send_action(REFRESH_SUMMARY_ACTION).unwrap();
    assert_eq!(action_rx.await.unwrap(), r#"{"action":"refresh_generator_summary_health"}"#);

    // The malformed payload is skipped
    match next_event(&mut events).await {
        Some(FeedEvent::Message(FeedMessage::Status(status))) => {
            assert!(status.cup_detected);
            assert_eq!(status.water_intake_message.as_deref(), Some("cup detected"));
        }
        other => panic!("expected status, got {:?}", other),
    }

    match next_event(&mut events).await {
        Some(FeedEvent::Closed(info)) => {
            assert_eq!(info.code, Some(1000));
            assert_eq!(info.reason, "bye");
        }
        other => panic!("expected close, got {:?}", other),
    }

    // Zero retry budget: the session ends and the channel with it
    assert_eq!(next_event(&mut events).await, None);
    assert_eq!(feed.stats().decode_failures, 1);

    server.await.unwrap();
}

#[tokio::test]
async fn test_live_feed_reconnects_after_server_drop() {
    let (listener, endpoint) = bind().await;

    let server = tokio::spawn(async move {
        // First connection is dropped right after the handshake
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        drop(ws);

        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(r#"{"seq":2}"#.into())).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let mut feed = LiveFeedClient::new(endpoint, RetryPolicy::new(3, Duration::from_millis(50)));
    let mut events = feed.subscribe(&ResourceId::new(CAMERA)).unwrap();

    assert_eq!(next_event(&mut events).await, Some(FeedEvent::Opened));
    assert!(matches!(next_event(&mut events).await, Some(FeedEvent::Closed(_))));
    assert_eq!(next_event(&mut events).await, Some(FeedEvent::Opened));

    match next_event(&mut events).await {
        Some(FeedEvent::Message(FeedMessage::Other(value))) => assert_eq!(value["seq"], 2),
        other => panic!("expected message, got {:?}", other),
    }

    // Open restored the budget
    assert_eq!(feed.stats().attempt, 0);
    assert!(feed.is_connected());

    feed.close();
    timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
}
