use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

pub const IDENTITY_FILE_NAME: &str = "identity.json";
pub const IDENTITY_VERSION: u32 = 3;

/// An agent's local identity, persisted once per worktree/module. `extra`
/// captures any field this build doesn't know about so round-tripping a
/// newer identity file through an older daemon build never silently drops
/// data the newer build (or a human editor) put there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub version: u32,
    pub repo_id: String,
    pub agent_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Identity {
    pub fn new(repo_id: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self {
            version: IDENTITY_VERSION,
            repo_id: repo_id.into(),
            agent_name: agent_name.into(),
            role: None,
            module: None,
            hostname: None,
            created_at: chrono::Utc::now(),
            extra: Map::new(),
        }
    }

    pub fn path(data_dir: &Path) -> std::path::PathBuf {
        data_dir.join(IDENTITY_FILE_NAME)
    }

    pub fn load(data_dir: &Path) -> Result<Option<Self>> {
        let path = Self::path(data_dir);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(ref err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(Self::path(data_dir), text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_identity_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Identity::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let identity = Identity::new("r_abc", "alice");
        identity.save(dir.path()).unwrap();

        let loaded = Identity::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.agent_name, "alice");
        assert_eq!(loaded.version, IDENTITY_VERSION);
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = Identity::path(dir.path());
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(
            &path,
            r#"{"version":3,"repo_id":"r_abc","agent_name":"alice",
               "created_at":"2026-01-01T00:00:00Z","future_field":"kept"}"#,
        )
        .unwrap();

        let identity = Identity::load(dir.path()).unwrap().unwrap();
        assert_eq!(identity.extra.get("future_field").unwrap(), "kept");

        identity.save(dir.path()).unwrap();
        let reloaded_text = std::fs::read_to_string(&path).unwrap();
        assert!(reloaded_text.contains("future_field"));
    }
}
