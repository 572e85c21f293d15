use serde::{Deserialize, Serialize};
use serde_json::Value;
use ssecast_core::error::{RelayError, Result};

use crate::frames::BroadcastEvent;

/// Publisher → relay request body.
/// Wire: `{ "event": "alert", "data": "fire" }`; `event` is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    pub data: Value,
}

impl PublishRequest {
    /// Parse a raw request body. Only a JSON object carrying `data` is accepted.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| RelayError::InvalidEvent(format!("body is not valid JSON: {e}")))?;
        if !value.is_object() {
            return Err(RelayError::InvalidEvent(
                "body must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| RelayError::InvalidEvent(e.to_string()))
    }

    pub fn into_event(self) -> Result<BroadcastEvent> {
        BroadcastEvent::new(self.event.as_deref(), self.data)
    }
}

/// Relay → publisher acknowledgment.
/// Wire: `{ "success": true }` or `{ "success": false, "error": "..." }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishAck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublishAck {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
        }
    }
}
