//! In-memory transport: a [`MockConnector`] handed to the client and a
//! [`MockHub`] the test keeps to accept, refuse, feed and sever connections.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::{Connection, Connector, TransportError};

#[derive(Default)]
struct HubState {
    attempts: Vec<Instant>,
    refusals: VecDeque<String>,
}

pub struct MockConnector {
    state: Arc<Mutex<HubState>>,
    accepted: mpsc::UnboundedSender<MockPeer>,
}

pub struct MockHub {
    state: Arc<Mutex<HubState>>,
    accepted: mpsc::UnboundedReceiver<MockPeer>,
}

/// Pair a connector for the client with the hub that observes it.
pub fn pair() -> (MockConnector, MockHub) {
    let state = Arc::new(Mutex::new(HubState::default()));
    let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
    (
        MockConnector {
            state: state.clone(),
            accepted: accepted_tx,
        },
        MockHub {
            state,
            accepted: accepted_rx,
        },
    )
}

#[async_trait]
impl Connector for MockConnector {
    type Connection = MockConnection;

    async fn connect(&mut self) -> Result<Self::Connection, TransportError> {
        let refusal = {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            state.attempts.push(Instant::now());
            state.refusals.pop_front()
        };
        if let Some(reason) = refusal {
            return Err(TransportError::Connect {
                endpoint: self.endpoint(),
                reason,
            });
        }

        let (to_server, from_client) = mpsc::unbounded_channel();
        let (to_client, from_server) = mpsc::unbounded_channel();
        let peer = MockPeer {
            from_client,
            to_client: Some(to_client),
        };
        self.accepted
            .send(peer)
            .map_err(|_| TransportError::Connect {
                endpoint: self.endpoint(),
                reason: "mock hub dropped".into(),
            })?;
        Ok(MockConnection {
            to_server,
            from_server,
        })
    }

    fn endpoint(&self) -> String {
        "mock://hub".into()
    }
}

impl MockHub {
    /// Wait for the client's next successful connection.
    pub async fn accept(&mut self) -> MockPeer {
        self.accepted
            .recv()
            .await
            .expect("mock connector dropped before connecting")
    }

    /// Fail the next connection attempt with `reason`. Calls queue up.
    pub fn refuse_next(&self, reason: impl Into<String>) {
        self.lock().refusals.push_back(reason.into());
    }

    /// Instants of every connection attempt, refused ones included.
    pub fn attempts(&self) -> Vec<Instant> {
        self.lock().attempts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Server side of one accepted connection.
pub struct MockPeer {
    from_client: mpsc::UnboundedReceiver<String>,
    to_client: Option<mpsc::UnboundedSender<Result<String, TransportError>>>,
}

impl MockPeer {
    /// Next frame the client sent on this connection.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    pub fn push(&self, frame: impl Into<String>) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(Ok(frame.into()));
        }
    }

    /// Abort the connection with a transport error.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if let Some(tx) = self.to_client.take() {
            let _ = tx.send(Err(TransportError::Receive(reason.into())));
        }
    }

    /// Close cleanly from the server side.
    pub fn close(&mut self) {
        self.to_client.take();
    }
}

pub struct MockConnection {
    to_server: mpsc::UnboundedSender<String>,
    from_server: mpsc::UnboundedReceiver<Result<String, TransportError>>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.to_server
            .send(text.to_owned())
            .map_err(|_| TransportError::Send("mock peer dropped".into()))
    }

    async fn recv_text(&mut self) -> Option<Result<String, TransportError>> {
        self.from_server.recv().await
    }
}
