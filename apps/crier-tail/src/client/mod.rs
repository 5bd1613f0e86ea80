//! Resumable stream client: one tokio task that owns the connection, the
//! reconnect timer and the [`StreamSession`]. Every socket or timer event is
//! handled to completion before the next one is awaited.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::sink::{DegradedSignal, RenderSink};
use crate::transport::{Connection, Connector, TransportError};

pub mod session;

pub use session::{
    ConnectionState, DEFAULT_RECONNECT_DELAY, Effect, Input, ReplayPolicy, SessionOptions,
    SessionStats, StreamSession,
};

/// Stand-in deadline for delays too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

pub struct StreamClient<C: Connector, S: RenderSink, D: DegradedSignal> {
    connector: C,
    session: StreamSession,
    sink: S,
    signal: D,
    connection: Option<C::Connection>,
    retry_at: Option<Instant>,
}

impl<C, S, D> StreamClient<C, S, D>
where
    C: Connector,
    S: RenderSink,
    D: DegradedSignal,
{
    pub fn new(connector: C, session: StreamSession, sink: S, signal: D) -> Self {
        Self {
            connector,
            session,
            sink,
            signal,
            connection: None,
            retry_at: None,
        }
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    /// Drive the session forever. The loop has no terminal state; callers
    /// stop it by dropping the future (e.g. from a `select!` on ctrl-c).
    pub async fn run(&mut self) {
        let mut pending: VecDeque<Effect> = self.session.start().into();
        loop {
            while let Some(effect) = pending.pop_front() {
                self.apply(effect, &mut pending).await;
            }
            let input = self.next_input().await;
            pending.extend(self.session.handle(input));
        }
    }

    async fn apply(&mut self, effect: Effect, pending: &mut VecDeque<Effect>) {
        match effect {
            Effect::Connect => {
                debug!(
                    target: "crier::client",
                    endpoint = %self.connector.endpoint(),
                    "connecting"
                );
                let input = match self.connector.connect().await {
                    Ok(connection) => {
                        self.connection = Some(connection);
                        Input::Opened
                    }
                    Err(err) => Input::Lost(err.to_string()),
                };
                pending.extend(self.session.handle(input));
            }
            Effect::Send(text) => {
                let Some(connection) = self.connection.as_mut() else {
                    return;
                };
                if let Err(err) = connection.send_text(&text).await {
                    pending.extend(self.session.handle(Input::Lost(err.to_string())));
                }
            }
            Effect::Render(markup) => {
                if let Err(err) = self.sink.render(&markup) {
                    warn!(target: "crier::client", error = %err, "render sink failed");
                }
            }
            Effect::ShowDegraded => {
                if let Err(err) = self.signal.show() {
                    warn!(target: "crier::client", error = %err, "failed to show degraded signal");
                }
            }
            Effect::HideDegraded => {
                if let Err(err) = self.signal.hide() {
                    warn!(target: "crier::client", error = %err, "failed to hide degraded signal");
                }
            }
            Effect::ScheduleRetry(delay) => {
                // Drop the dead connection now so nothing stale can be read.
                self.connection = None;
                let now = Instant::now();
                self.retry_at = Some(now.checked_add(delay).unwrap_or(now + FAR_FUTURE));
            }
        }
    }

    async fn next_input(&mut self) -> Input {
        if let Some(connection) = self.connection.as_mut() {
            return match connection.recv_text().await {
                Some(Ok(frame)) => Input::Frame(frame),
                Some(Err(err)) => Input::Lost(err.to_string()),
                None => Input::Lost(TransportError::RemoteClosed.to_string()),
            };
        }
        match self.retry_at.take() {
            Some(deadline) => {
                sleep_until(deadline).await;
                Input::RetryElapsed
            }
            // Every Closed entry arms a deadline, so nothing can wake us here.
            None => std::future::pending().await,
        }
    }
}
