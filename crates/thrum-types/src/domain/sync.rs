use serde::{Deserialize, Serialize};

/// Tracks, for one remote peer, the last journal position this daemon has
/// pushed and the last peer position it has consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncCheckpoint {
    pub peer_id: String,
    #[serde(default)]
    pub last_pushed_event_id: Option<String>,
    #[serde(default)]
    pub last_pulled_event_id: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Running,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncState,
    #[serde(default)]
    pub last_push_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub last_pull_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
    pub checkpoints: Vec<SyncCheckpoint>,
}
