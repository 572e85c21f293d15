use std::borrow::Cow;

use bytes::Bytes;
use serde_json::Value;
use ssecast_core::error::{RelayError, Result};

use crate::routes::{EVENT_MESSAGE, EVENT_PING, EVENT_SERVICE, WELCOME_TEXT};

/// Event body as handed in by a publisher.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Sent verbatim on the `data:` line(s).
    Text(String),
    /// Sent as its compact JSON text.
    Json(Value),
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Payload::Text(s),
            other => Payload::Json(other),
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

/// One unit of fan-out.
/// Wire: `event: <type>\ndata: <payload>\n\n`
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastEvent {
    event_type: String,
    payload: Payload,
}

impl BroadcastEvent {
    /// Build an event, defaulting a missing or empty type to `message`.
    ///
    /// The type is written on a single `event:` line, so line breaks in it
    /// are rejected.
    pub fn new(event_type: Option<&str>, payload: impl Into<Payload>) -> Result<Self> {
        let event_type = match event_type {
            Some(t) if !t.is_empty() => t,
            _ => EVENT_MESSAGE,
        };
        if event_type.contains(['\r', '\n']) {
            return Err(RelayError::InvalidEvent(
                "event type must be a single line".to_string(),
            ));
        }
        Ok(Self {
            event_type: event_type.to_string(),
            payload: payload.into(),
        })
    }

    /// Liveness event emitted by the keep-alive driver.
    pub fn ping() -> Self {
        Self {
            event_type: EVENT_PING.to_string(),
            payload: Payload::Text(String::new()),
        }
    }

    /// Informational event every subscriber receives first.
    pub fn welcome() -> Self {
        Self {
            event_type: EVENT_SERVICE.to_string(),
            payload: Payload::Text(WELCOME_TEXT.to_string()),
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Serialize into the subscriber framing.
    ///
    /// Multi-line text becomes one `data:` line per line so a streaming
    /// parser never sees a bare line inside a record.
    pub fn encode(&self) -> Bytes {
        let data: Cow<'_, str> = match &self.payload {
            Payload::Text(s) => Cow::Borrowed(s.as_str()),
            Payload::Json(v) => Cow::Owned(v.to_string()),
        };

        let mut out = String::with_capacity(self.event_type.len() + data.len() + 16);
        out.push_str("event: ");
        out.push_str(&self.event_type);
        out.push('\n');

        let normalized = data.replace("\r\n", "\n");
        for line in normalized.split(['\r', '\n']) {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        Bytes::from(out)
    }
}
