use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub mod mock;
pub mod websocket;

/// Everything the session controller can observe from the transport,
/// delivered as one ordered stream through a single receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established; emitted exactly once, before any message.
    Open,
    /// Binary payload: raw remote output, displayed verbatim.
    Binary(Bytes),
    /// Non-binary payload: an out-of-band notice, never terminal content.
    Text(String),
    /// Connection ended, cleanly or not. Terminal for the session.
    Closed,
    /// Transport-level error. Informational; never terminal by itself.
    Error(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket connect failed: {0}")]
    Connect(String),
    #[error("transport channel closed")]
    ChannelClosed,
}

/// Outbound half of a duplex connection. `send` is fire-and-forget:
/// buffering and flow control belong to the transport, not the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError>;
}
