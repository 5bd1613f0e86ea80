//! The stream client's state machine, free of I/O.
//!
//! The driver in [`super::StreamClient`] turns socket and timer activity into
//! [`Input`]s and carries out the [`Effect`]s that come back. Everything that
//! has to survive a reconnect lives here.

use std::cmp::Ordering;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::color::ColorAssigner;
use crate::event::{Event, EventId};
use crate::group::GroupBuffer;
use crate::render::Renderer;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// How to treat events the producer replays at or before the cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplayPolicy {
    /// Render every delivered event. Duplicates show up if the producer
    /// resumes inclusively.
    #[default]
    RenderAll,
    /// Drop events whose id does not sort after the cursor.
    SkipReplayed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// The low-level connection is established.
    Opened,
    /// One inbound text frame.
    Frame(String),
    /// Connection attempt failed, errored, or was closed by the remote.
    Lost(String),
    /// The reconnect delay armed on entering `Closed` has elapsed.
    RetryElapsed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Connect,
    Send(String),
    Render(String),
    ShowDegraded,
    HideDegraded,
    ScheduleRetry(Duration),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub events_ingested: u64,
    pub frames_dropped: u64,
    pub replays_skipped: u64,
    pub connections_opened: u64,
    pub disconnects: u64,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub resume_from: EventId,
    pub reconnect_delay: Duration,
    pub replay_policy: ReplayPolicy,
    pub renderer: Renderer,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            resume_from: EventId::start(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            replay_policy: ReplayPolicy::default(),
            renderer: Renderer::new(),
        }
    }
}

pub struct StreamSession {
    state: ConnectionState,
    last_message_id: EventId,
    reconnect_delay: Duration,
    replay_policy: ReplayPolicy,
    colors: ColorAssigner,
    groups: GroupBuffer,
    renderer: Renderer,
    stats: SessionStats,
}

impl StreamSession {
    pub fn new(options: SessionOptions) -> Self {
        Self::with_colors(options, ColorAssigner::new())
    }

    pub fn with_colors(options: SessionOptions, colors: ColorAssigner) -> Self {
        Self {
            state: ConnectionState::Connecting,
            groups: GroupBuffer::new(options.resume_from.clone()),
            last_message_id: options.resume_from,
            reconnect_delay: options.reconnect_delay,
            replay_policy: options.replay_policy,
            colors,
            renderer: options.renderer,
            stats: SessionStats::default(),
        }
    }

    /// Effects that kick off the very first connection.
    pub fn start(&mut self) -> Vec<Effect> {
        self.state = ConnectionState::Connecting;
        vec![Effect::Connect]
    }

    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        match (self.state, input) {
            (ConnectionState::Connecting, Input::Opened) => self.on_open(),
            (ConnectionState::Open, Input::Frame(payload)) => self.on_frame(&payload),
            (ConnectionState::Connecting | ConnectionState::Open, Input::Lost(reason)) => {
                self.on_lost(&reason)
            }
            (ConnectionState::Closed, Input::RetryElapsed) => {
                debug!(target: "crier::client", "reconnect delay elapsed");
                self.state = ConnectionState::Connecting;
                vec![Effect::Connect]
            }
            (state, input) => {
                trace!(target: "crier::client", ?state, ?input, "input ignored in current state");
                Vec::new()
            }
        }
    }

    fn on_open(&mut self) -> Vec<Effect> {
        self.state = ConnectionState::Open;
        self.stats.connections_opened += 1;
        info!(
            target: "crier::client",
            resume_from = %self.last_message_id,
            from_start = self.last_message_id.is_start(),
            "stream connected"
        );
        vec![
            Effect::Send(self.last_message_id.as_str().to_owned()),
            Effect::HideDegraded,
        ]
    }

    fn on_frame(&mut self, payload: &str) -> Vec<Effect> {
        let event = match Event::decode(payload) {
            Ok(event) => event,
            Err(err) => {
                self.stats.frames_dropped += 1;
                warn!(
                    target: "crier::client",
                    error = %err,
                    dropped = self.stats.frames_dropped,
                    "dropping undecodable frame"
                );
                return Vec::new();
            }
        };

        if self.replay_policy == ReplayPolicy::SkipReplayed
            && event.id.cmp_position(&self.last_message_id) != Ordering::Greater
        {
            self.stats.replays_skipped += 1;
            debug!(
                target: "crier::client",
                id = %event.id,
                cursor = %self.last_message_id,
                "skipping replayed event"
            );
            return Vec::new();
        }

        self.stats.events_ingested += 1;
        let state = self
            .groups
            .ingest(event, &mut self.colors, &self.renderer);
        let color = self.colors.color_for(state.active.host());
        let markup = self.renderer.render(state.active, color, state.closed);
        self.last_message_id = self.groups.cursor().clone();
        vec![Effect::Render(markup)]
    }

    fn on_lost(&mut self, reason: &str) -> Vec<Effect> {
        let was = self.state;
        self.state = ConnectionState::Closed;
        if was == ConnectionState::Open {
            self.stats.disconnects += 1;
        }
        warn!(
            target: "crier::client",
            reason,
            was_open = was == ConnectionState::Open,
            resume_from = %self.last_message_id,
            retry_in = ?self.reconnect_delay,
            events = self.stats.events_ingested,
            dropped = self.stats.frames_dropped,
            disconnects = self.stats.disconnects,
            "stream unavailable; reconnect scheduled"
        );
        vec![
            Effect::ShowDegraded,
            Effect::ScheduleRetry(self.reconnect_delay),
        ]
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn last_message_id(&self) -> &EventId {
        &self.last_message_id
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn groups(&self) -> &GroupBuffer {
        &self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: &str, host: &str, message: &str) -> Input {
        Input::Frame(
            serde_json::json!({ "id": id, "host": host, "message_head": message }).to_string(),
        )
    }

    fn opened_session(options: SessionOptions) -> StreamSession {
        let mut session = StreamSession::new(options);
        assert_eq!(session.start(), vec![Effect::Connect]);
        session.handle(Input::Opened);
        session
    }

    #[test]
    fn first_open_sends_start_sentinel_and_hides_overlay() {
        let mut session = StreamSession::new(SessionOptions::default());
        session.start();
        let effects = session.handle(Input::Opened);
        assert_eq!(
            effects,
            vec![Effect::Send("0-0".into()), Effect::HideDegraded]
        );
        assert_eq!(session.state(), ConnectionState::Open);
    }

    #[test]
    fn frames_render_and_advance_cursor() {
        let mut session = opened_session(SessionOptions::default());
        session.handle(frame("1-0", "a", "x"));
        session.handle(frame("1-1", "a", "y"));
        let effects = session.handle(frame("2-0", "b", "z"));

        let [Effect::Render(markup)] = effects.as_slice() else {
            panic!("expected a single render, got {effects:?}");
        };
        let z = markup.find("<td>z</td>").expect("z row");
        let y = markup.find("<td>y</td>").expect("y row");
        let x = markup.find("<td>x</td>").expect("x row");
        assert!(z < y && y < x);
        assert_eq!(markup.matches("<table").count(), 2);
        assert_eq!(session.last_message_id().as_str(), "2-0");
        assert_eq!(session.groups().state().active.host(), "b");
    }

    #[test]
    fn active_host_color_is_assigned_on_first_event() {
        let mut session = opened_session(SessionOptions::default());
        let effects = session.handle(frame("1-0", "a", "x"));
        let [Effect::Render(first)] = effects.as_slice() else {
            panic!("expected render");
        };
        assert!(first.contains("compact red table"));
        let effects = session.handle(frame("2-0", "b", "y"));
        let [Effect::Render(second)] = effects.as_slice() else {
            panic!("expected render");
        };
        assert!(second.starts_with(r#"<table class="ui celled very compact orange table">"#));
        assert!(second.contains("compact red table"));
    }

    #[test]
    fn malformed_frame_is_dropped_without_state_change() {
        let mut session = opened_session(SessionOptions::default());
        session.handle(frame("1-0", "a", "x"));
        assert!(session.handle(Input::Frame("{not json".into())).is_empty());
        assert_eq!(session.state(), ConnectionState::Open);
        assert_eq!(session.last_message_id().as_str(), "1-0");
        assert_eq!(session.stats().frames_dropped, 1);
        assert_eq!(session.stats().events_ingested, 1);
    }

    #[test]
    fn loss_shows_overlay_and_arms_one_retry() {
        let mut session = opened_session(SessionOptions::default());
        let effects = session.handle(Input::Lost("reset".into()));
        assert_eq!(
            effects,
            vec![
                Effect::ShowDegraded,
                Effect::ScheduleRetry(Duration::from_secs(3))
            ]
        );
        assert_eq!(session.state(), ConnectionState::Closed);
        // A second loss report while already closed must not re-arm.
        assert!(session.handle(Input::Lost("again".into())).is_empty());
        assert_eq!(session.handle(Input::RetryElapsed), vec![Effect::Connect]);
        assert_eq!(session.state(), ConnectionState::Connecting);
    }

    #[test]
    fn failed_connect_goes_straight_to_closed() {
        let mut session = StreamSession::new(SessionOptions::default());
        session.start();
        let effects = session.handle(Input::Lost("refused".into()));
        assert!(effects.contains(&Effect::ScheduleRetry(DEFAULT_RECONNECT_DELAY)));
        assert_eq!(session.stats().disconnects, 0);
    }

    #[test]
    fn reconnect_resumes_from_last_ingested_id() {
        let mut session = opened_session(SessionOptions::default());
        for (n, host) in ["a", "a", "b"].iter().enumerate() {
            session.handle(frame(&format!("5-{n}"), host, "m"));
        }
        session.handle(Input::Lost("reset".into()));
        session.handle(Input::RetryElapsed);
        let effects = session.handle(Input::Opened);
        assert_eq!(effects[0], Effect::Send("5-2".into()));
        assert_eq!(session.stats().connections_opened, 2);
        assert_eq!(session.stats().disconnects, 1);
    }

    #[test]
    fn frames_outside_open_are_ignored() {
        let mut session = StreamSession::new(SessionOptions::default());
        session.start();
        assert!(session.handle(frame("1-0", "a", "x")).is_empty());
        assert!(session.handle(Input::RetryElapsed).is_empty());
        assert_eq!(session.stats().events_ingested, 0);
    }

    #[test]
    fn render_all_keeps_inclusive_replays() {
        let mut session = opened_session(SessionOptions::default());
        session.handle(frame("7-0", "a", "x"));
        session.handle(Input::Lost("reset".into()));
        session.handle(Input::RetryElapsed);
        session.handle(Input::Opened);
        let effects = session.handle(frame("7-0", "a", "x"));
        let [Effect::Render(markup)] = effects.as_slice() else {
            panic!("expected render");
        };
        assert_eq!(markup.matches("<td>x</td>").count(), 2);
        assert_eq!(session.stats().events_ingested, 2);
    }

    #[test]
    fn skip_replayed_drops_ids_at_or_before_cursor() {
        let mut session = opened_session(SessionOptions {
            replay_policy: ReplayPolicy::SkipReplayed,
            ..SessionOptions::default()
        });
        session.handle(frame("7-0", "a", "x"));
        session.handle(Input::Lost("reset".into()));
        session.handle(Input::RetryElapsed);
        session.handle(Input::Opened);
        assert!(session.handle(frame("6-9", "a", "old")).is_empty());
        assert!(session.handle(frame("7-0", "a", "x")).is_empty());
        assert_eq!(session.handle(frame("7-1", "a", "new")).len(), 1);
        let stats = session.stats();
        assert_eq!(stats.replays_skipped, 2);
        assert_eq!(stats.events_ingested, 2);
        assert_eq!(session.last_message_id().as_str(), "7-1");
    }

    #[test]
    fn custom_resume_point_and_delay_are_honoured() {
        let mut session = opened_session(SessionOptions {
            resume_from: EventId::from("42-7"),
            reconnect_delay: Duration::from_millis(250),
            ..SessionOptions::default()
        });
        assert_eq!(session.last_message_id().as_str(), "42-7");
        let effects = session.handle(Input::Lost("bye".into()));
        assert_eq!(effects[1], Effect::ScheduleRetry(Duration::from_millis(250)));
    }
}
