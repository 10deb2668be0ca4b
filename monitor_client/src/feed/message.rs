//! Live feed payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Greeting sent by the backend right after the socket is accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Welcome {
    pub message: String,
    pub timestamp: f64,
    pub camera_ip: String,
}

/// Periodic status push for one monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Unix seconds
    pub timestamp: i64,

    /// Resolved monitor identifier
    pub camera_ip: String,

    pub person_detected: bool,

    pub cup_detected: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub today_work_duration_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_summary_health_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_intake_message: Option<String>,
}

/// Decoded inbound message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum FeedMessage {
    Welcome(Welcome),
    Status(StatusUpdate),
    /// Valid JSON of a shape this client does not model
    Other(Value),
}

impl FeedMessage {
    /// Parse a text payload. Anything that is valid JSON decodes; only
    /// malformed payloads return an error.
    pub fn decode(payload: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(payload)?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        if value.get("type").and_then(Value::as_str) == Some("welcome") {
            if let Ok(welcome) = serde_json::from_value::<Welcome>(value.clone()) {
                return FeedMessage::Welcome(welcome);
            }
        } else if value.get("person_detected").is_some() {
            if let Ok(status) = serde_json::from_value::<StatusUpdate>(value.clone()) {
                return FeedMessage::Status(status);
            }
        }

        FeedMessage::Other(value)
    }
}

/// Outbound control message understood by the backend
pub fn action_payload(action: &str) -> String {
    serde_json::json!({ "action": action }).to_string()
}

/// Ask the backend to regenerate the AI health summary
pub const REFRESH_SUMMARY_ACTION: &str = "refresh_generator_summary_health";
