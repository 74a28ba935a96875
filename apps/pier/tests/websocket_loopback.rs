//! Loopback test: the websocket channel against a real server endpoint.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

use pier_client_core::transport::websocket::config::EndpointConfig;
use pier_client_core::transport::websocket::WebSocketChannel;
use pier_client_core::transport::{Transport, TransportEvent};

const WAIT: Duration = Duration::from_secs(5);

async fn serve_session(mut socket: WebSocket, frames: mpsc::UnboundedSender<Vec<u8>>) {
    socket.send(Message::Binary(b"hi".to_vec())).await.ok();
    socket
        .send(Message::Text("maintenance".to_string()))
        .await
        .ok();

    // Relay the first client frame to the test, then end the session.
    while let Some(Ok(msg)) = socket.recv().await {
        if let Message::Binary(frame) = msg {
            let _ = frames.send(frame);
            break;
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("event within deadline")
        .expect("event stream open")
}

#[tokio::test]
async fn channel_delivers_events_and_frames_in_order() {
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let app = Router::new().route(
        "/term/ws/",
        get(move |ws: WebSocketUpgrade| {
            let frames_tx = frames_tx.clone();
            async move { ws.on_upgrade(move |socket| serve_session(socket, frames_tx)) }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let endpoint = EndpointConfig::new(format!("http://127.0.0.1:{}/term", addr.port()));
    let (channel, mut events) = WebSocketChannel::connect(&endpoint)
        .await
        .expect("connect loopback");

    assert_eq!(next_event(&mut events).await, TransportEvent::Open);
    assert_eq!(
        next_event(&mut events).await,
        TransportEvent::Binary(Bytes::from_static(b"hi"))
    );
    assert_eq!(
        next_event(&mut events).await,
        TransportEvent::Text("maintenance".to_string())
    );

    channel.send(&[0x00, 0x41]).await.expect("send frame");
    let frame = timeout(WAIT, frames_rx.recv())
        .await
        .expect("frame within deadline")
        .expect("server got frame");
    assert_eq!(frame, vec![0x00, 0x41]);

    assert_eq!(next_event(&mut events).await, TransportEvent::Closed);
}

#[tokio::test]
async fn connect_to_closed_port_fails() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let endpoint = EndpointConfig::new(format!("127.0.0.1:{}", addr.port()));
    let result = WebSocketChannel::connect(&endpoint).await;
    assert!(result.is_err());
}
