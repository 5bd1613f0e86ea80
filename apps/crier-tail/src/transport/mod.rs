//! Connection plumbing for the stream client. The client only needs a
//! text-frame duplex per connection; [`websocket`] provides the real one and
//! [`mock`] an in-memory pair for driving the client in tests.

use async_trait::async_trait;
use thiserror::Error;

pub mod mock;
pub mod websocket;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },
    #[error("send failed: {0}")]
    Send(String),
    #[error("receive failed: {0}")]
    Receive(String),
    #[error("connection closed by remote")]
    RemoteClosed,
}

/// Opens fresh connections to the configured endpoint.
#[async_trait]
pub trait Connector: Send {
    type Connection: Connection;

    async fn connect(&mut self) -> Result<Self::Connection, TransportError>;

    fn endpoint(&self) -> String;
}

/// One established connection carrying text frames.
#[async_trait]
pub trait Connection: Send {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Next inbound text frame. `None` once the remote has closed cleanly.
    async fn recv_text(&mut self) -> Option<Result<String, TransportError>>;
}
