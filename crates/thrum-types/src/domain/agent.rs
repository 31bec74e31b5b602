use crate::ids::{AgentName, SessionId};
use serde::{Deserialize, Serialize};

/// A registered agent. `agent_id` is either supplied at registration or, when
/// absent, minted deterministically from `(repo_id, role, module)` so the
/// same role in the same module always resolves to the same identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub name: AgentName,
    pub agent_id: String,
    pub role: String,
    pub module: String,
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Agent {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Per-session branch/intent/task state, cascaded away when its session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorkContext {
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub worktree_path: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub current_task: Option<String>,
    #[serde(default)]
    pub dirty_files: Vec<String>,
}
