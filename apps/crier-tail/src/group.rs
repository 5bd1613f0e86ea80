use crate::color::ColorAssigner;
use crate::event::{Event, EventId};
use crate::render::Renderer;

/// A run of events from one host, contiguous in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    host: String,
    events: Vec<Event>,
}

impl Group {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().rev()
    }

    pub(crate) fn push(&mut self, event: Event) {
        self.host.clone_from(&event.host);
        self.events.push(event);
    }
}

/// What a render needs after an ingest.
#[derive(Debug, Clone, Copy)]
pub struct RenderState<'a> {
    pub active: &'a Group,
    pub closed: &'a str,
}

/// Holds the active group and the markup of every group closed before it.
///
/// Closed groups are rendered once, at close time, and prepended so the most
/// recently closed group is always first. History is never trimmed.
#[derive(Debug, Clone)]
pub struct GroupBuffer {
    active: Group,
    closed: String,
    closed_groups: usize,
    cursor: EventId,
}

impl Default for GroupBuffer {
    fn default() -> Self {
        Self::new(EventId::start())
    }
}

impl GroupBuffer {
    pub fn new(cursor: EventId) -> Self {
        Self {
            active: Group::default(),
            closed: String::new(),
            closed_groups: 0,
            cursor,
        }
    }

    pub fn ingest(
        &mut self,
        event: Event,
        colors: &mut ColorAssigner,
        renderer: &Renderer,
    ) -> RenderState<'_> {
        if !self.active.is_empty() && event.host != self.active.host {
            let finished = std::mem::take(&mut self.active);
            let color = colors.color_for(finished.host());
            let mut table = renderer.group_table(&finished, color);
            table.push_str(&self.closed);
            self.closed = table;
            self.closed_groups += 1;
        }

        self.cursor = event.id.clone();
        self.active.push(event);
        self.state()
    }

    pub fn state(&self) -> RenderState<'_> {
        RenderState {
            active: &self.active,
            closed: &self.closed,
        }
    }

    /// Id of the most recently ingested event, or the starting cursor.
    pub fn cursor(&self) -> &EventId {
        &self.cursor
    }

    pub fn closed_groups(&self) -> usize {
        self.closed_groups
    }
}
