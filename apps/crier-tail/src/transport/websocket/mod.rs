use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, trace, warn};
use url::Url;

use super::{Connection, Connector, TransportError};

pub mod config;
pub use config::WebSocketConfig;

/// Dials the producer's WebSocket endpoint once per [`Connector::connect`].
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    /// Takes an endpoint already normalised by [`WebSocketConfig::build_url`].
    pub fn new(url: &Url) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Connection = WebSocketConnection;

    async fn connect(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, response) =
            connect_async(self.url.as_str())
                .await
                .map_err(|err| TransportError::Connect {
                    endpoint: self.url.clone(),
                    reason: err.to_string(),
                })?;
        debug!(
            target: "crier::transport",
            url = %self.url,
            status = %response.status(),
            "websocket handshake complete"
        );
        Ok(WebSocketConnection { stream })
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }
}

pub struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.to_owned()))
            .await
            .map_err(|err| TransportError::Send(err.to_string()))
    }

    async fn recv_text(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(data)) => match String::from_utf8(data) {
                    Ok(text) => return Some(Ok(text)),
                    Err(err) => {
                        warn!(
                            target: "crier::transport",
                            error = %err,
                            "dropping non-utf8 binary frame"
                        );
                    }
                },
                Ok(Message::Close(frame)) => {
                    debug!(target: "crier::transport", ?frame, "remote sent close frame");
                    return None;
                }
                // Pings are answered by tungstenite on the next read.
                Ok(other) => trace!(target: "crier::transport", ?other, "ignoring control frame"),
                Err(err) => return Some(Err(TransportError::Receive(err.to_string()))),
            }
        }
    }
}
