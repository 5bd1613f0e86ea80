use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

/// Cursor value meaning "replay the stream from the beginning".
pub const RESUME_FROM_START: &str = "0-0";

/// Producer-issued position token. Doubles as the resume cursor.
///
/// The producer hands out stream ids shaped `<millis>-<seq>`, but the client
/// treats the value as opaque: it is echoed back verbatim on reconnect and
/// only compared through [`EventId::cmp_position`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn start() -> Self {
        Self(RESUME_FROM_START.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_start(&self) -> bool {
        self.0 == RESUME_FROM_START
    }

    /// Orders two ids by stream position. `<millis>-<seq>` ids compare
    /// numerically on both parts; anything else falls back to byte order and
    /// sorts after every well-formed stream id.
    pub fn cmp_position(&self, other: &EventId) -> Ordering {
        match (self.stream_parts(), other.stream_parts()) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }

    /// Wall-clock time the producer stamped into a `<millis>-<seq>` id.
    pub fn timestamp(&self) -> Option<OffsetDateTime> {
        let (millis, _) = self.stream_parts()?;
        let nanos = i128::from(millis).checked_mul(1_000_000)?;
        OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
    }

    fn stream_parts(&self) -> Option<(u64, u64)> {
        let (millis, seq) = self.0.split_once('-')?;
        Some((millis.parse().ok()?, seq.parse().ok()?))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// One host-tagged log line pushed by the producer.
///
/// `message_head` arrives already truncated and HTML-escaped; the client
/// never rewrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub host: String,
    pub message_head: String,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed event payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        host: impl Into<String>,
        message_head: impl Into<String>,
    ) -> Self {
        Self {
            id: EventId::new(id),
            host: host.into(),
            message_head: message_head.into(),
        }
    }

    pub fn decode(payload: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_producer_payload_and_ignores_extra_fields() {
        let event = Event::decode(
            r#"{"id":"1700000000000-3","host":"10.0.0.7","message_head":"disk full...","extra":1}"#,
        )
        .expect("decode");
        assert_eq!(event.id.as_str(), "1700000000000-3");
        assert_eq!(event.host, "10.0.0.7");
        assert_eq!(event.message_head, "disk full...");
    }

    #[test]
    fn rejects_payloads_missing_fields_or_not_json() {
        assert!(Event::decode(r#"{"id":"1-0","host":"a"}"#).is_err());
        assert!(Event::decode(r#"{"id":1,"host":"a","message_head":"x"}"#).is_err());
        assert!(Event::decode("init").is_err());
    }

    #[test]
    fn stream_ids_compare_numerically() {
        let earlier = EventId::from("999-9");
        let later = EventId::from("1000-0");
        assert_eq!(earlier.cmp_position(&later), Ordering::Less);
        assert_eq!(
            EventId::from("5-2").cmp_position(&EventId::from("5-10")),
            Ordering::Less
        );
        assert_eq!(EventId::start().cmp_position(&earlier), Ordering::Less);
    }

    #[test]
    fn opaque_ids_fall_back_to_byte_order_after_stream_ids() {
        let opaque = EventId::from("cursor-b");
        assert_eq!(
            opaque.cmp_position(&EventId::from("cursor-a")),
            Ordering::Greater
        );
        assert_eq!(
            EventId::from("99-0").cmp_position(&opaque),
            Ordering::Less
        );
    }

    #[test]
    fn timestamp_comes_from_millis_prefix() {
        let id = EventId::from("1700000000123-0");
        let ts = id.timestamp().expect("timestamp");
        assert_eq!(ts.unix_timestamp(), 1_700_000_000);
        assert_eq!(ts.millisecond(), 123);
        assert!(EventId::from("opaque").timestamp().is_none());
    }
}
