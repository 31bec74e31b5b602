use crate::ids::{AgentName, SessionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    Requested,
    ManualCleanup,
    AutomatedCleanup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub agent: AgentName,
    pub state: SessionState,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub last_heartbeat_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub end_reason: Option<SessionEndReason>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Starting | SessionState::Active)
    }

    pub fn idle_for(&self, now: chrono::DateTime<chrono::Utc>) -> chrono::Duration {
        now - self.last_heartbeat_at
    }
}
