use crate::event::payload::EventPayload;
use crate::ids::EventId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current journal record schema version. Bumped when a field is added or
/// reinterpreted in a way that changes how older records must be read.
pub const SCHEMA_VERSION: u32 = 1;

/// One line of a journal file. `v`, `event_id`, `timestamp` and
/// `origin_daemon` are carried by every record regardless of type; the rest
/// of the line is the flattened `EventPayload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub v: u32,
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_daemon: Option<String>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl EventRecord {
    pub fn new(event_id: EventId, origin_daemon: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            v: SCHEMA_VERSION,
            event_id,
            timestamp: Utc::now(),
            origin_daemon: Some(origin_daemon.into()),
            payload,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.payload.type_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AgentName;

    #[test]
    fn round_trips_through_json_with_flattened_payload() {
        let record = EventRecord::new(
            EventId::from_raw("evt_01harz0000000000000000000"),
            "daemon-a",
            EventPayload::SessionStart {
                session_id: crate::ids::SessionId::from_raw("ses_abc"),
                agent: AgentName::from_validated("alice"),
            },
        );
        let line = serde_json::to_string(&record).unwrap();
        assert!(line.contains("\"type\":\"session.start\""));
        let back: EventRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(back.type_name(), "session.start");
    }

    #[test]
    fn ignores_unknown_legacy_fields() {
        let line = r#"{"v":1,"event_id":"evt_x","timestamp":"2026-01-01T00:00:00Z",
            "type":"message.create","message_id":"msg_x","author":"alice",
            "content":"hi","priority":"high"}"#;
        let record: EventRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.type_name(), "message.create");
    }
}
