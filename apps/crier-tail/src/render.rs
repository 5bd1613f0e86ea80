//! Markup for the tail view. Everything here is a pure function of its
//! inputs; the only state is the optional full-message link base.

use std::fmt::Write as _;

use time::format_description::well_known::Rfc3339;

use crate::color::Color;
use crate::event::Event;
use crate::group::Group;

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    message_base: Option<String>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link each id cell to `<base>/message/<id>`, where the producer serves
    /// the untruncated message.
    pub fn with_message_base(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        let trimmed = base.trim_end_matches('/');
        self.message_base = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self
    }

    /// Full view: the active group's table on top of every closed group.
    pub fn render(&self, active: &Group, color: Color, closed: &str) -> String {
        if active.is_empty() {
            return closed.to_owned();
        }
        let mut out = self.group_table(active, color);
        out.push_str(closed);
        out
    }

    /// One table per group, rows newest first.
    pub fn group_table(&self, group: &Group, color: Color) -> String {
        let mut out = String::with_capacity(256 + group.len() * 96);
        let _ = write!(
            out,
            r#"<table class="ui celled very compact {color} table">
    <thead>
        <tr>
            <th>Time</th>
            <th>Host</th>
            <th>Message</th>
        </tr>
    </thead>
    <tbody>
"#
        );
        for event in group.newest_first() {
            self.push_row(&mut out, event);
        }
        out.push_str("    </tbody>\n</table>\n");
        out
    }

    fn push_row(&self, out: &mut String, event: &Event) {
        let id = escape_html(event.id.as_str());
        out.push_str("        <tr>\n");
        match event.id.timestamp().and_then(|ts| ts.format(&Rfc3339).ok()) {
            Some(stamp) => {
                let _ = write!(out, r#"        <td title="{stamp}">"#);
            }
            None => out.push_str("        <td>"),
        }
        match &self.message_base {
            Some(base) => {
                let _ = write!(out, r#"<a href="{base}/message/{id}">{id}</a>"#);
            }
            None => out.push_str(&id),
        }
        out.push_str("</td>\n");
        let _ = writeln!(out, "        <td>{}</td>", escape_html(&event.host));
        // Already escaped by the producer.
        let _ = writeln!(out, "        <td>{}</td>", event.message_head);
        out.push_str("        </tr>\n");
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
