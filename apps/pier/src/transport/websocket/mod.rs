use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use super::{Transport, TransportError, TransportEvent};
use crate::telemetry::logging::hexdump;

pub mod config;
use config::EndpointConfig;

/// WebSocket implementation of the Transport trait.
///
/// Owns exactly one binary-mode connection. There is no reconnect: once the
/// channel reports `Closed` the session it backs is over.
pub struct WebSocketChannel {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    ws_task: Option<tokio::task::JoinHandle<()>>,
}

impl WebSocketChannel {
    /// Connect to the derived endpoint and return the channel plus its
    /// event stream. `TransportEvent::Open` is the first event delivered.
    pub async fn connect(
        config: &EndpointConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), TransportError> {
        let url = config.ws_url();
        debug!(%url, "connecting websocket channel");

        let (ws_stream, _) = connect_async(&url)
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;

        let (tx_out, rx_out) = mpsc::unbounded_channel::<Vec<u8>>();
        let (tx_event, rx_event) = mpsc::unbounded_channel::<TransportEvent>();

        // The handshake is already complete, so Open precedes every message.
        let _ = tx_event.send(TransportEvent::Open);

        let ws_task = tokio::spawn(async move {
            pump_websocket(ws_stream, rx_out, tx_event).await;
        });

        Ok((
            Self {
                tx: tx_out,
                ws_task: Some(ws_task),
            },
            rx_event,
        ))
    }
}

#[async_trait]
impl Transport for WebSocketChannel {
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        self.tx
            .send(frame.to_vec())
            .map_err(|_| TransportError::ChannelClosed)
    }
}

/// Move bytes between the socket and the channel pair until the connection
/// ends. `Closed` is emitted exactly once, after the stream is exhausted.
async fn pump_websocket(
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut rx_out: mpsc::UnboundedReceiver<Vec<u8>>,
    tx_event: mpsc::UnboundedSender<TransportEvent>,
) {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Forward outbound frames to the socket as binary messages.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx_out.recv().await {
            if ws_sender.send(Message::Binary(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Binary(data)) => {
                trace!("inbound binary\n{}", hexdump(&data));
                if tx_event.send(TransportEvent::Binary(Bytes::from(data))).is_err() {
                    break;
                }
            }
            Ok(Message::Text(text)) => {
                if tx_event.send(TransportEvent::Text(text)).is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            // Errors are surfaced but never end the session by themselves;
            // a fatal one is followed by the stream running out.
            Err(err) => {
                let _ = tx_event.send(TransportEvent::Error(err.to_string()));
            }
            _ => {} // Ping/Pong handled by tungstenite
        }
    }

    let _ = tx_event.send(TransportEvent::Closed);

    send_task.abort();
    let _ = send_task.await;
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        if let Some(task) = self.ws_task.take() {
            task.abort();
        }
    }
}
