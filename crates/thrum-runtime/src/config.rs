use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Resolve the daemon's data directory, in priority order:
/// 1. an explicit path (with `~` expansion)
/// 2. the `THRUM_DATA_DIR` environment variable
/// 3. the platform data directory (`~/.local/share/thrum` on Linux, etc.)
/// 4. `~/.thrum` as a last resort
pub fn resolve_data_dir(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand_tilde(path));
    }
    if let Ok(env_path) = std::env::var("THRUM_DATA_DIR") {
        return Ok(expand_tilde(&env_path));
    }
    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("thrum"));
    }
    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".thrum"));
    }
    Err(Error::Config(
        "could not determine a data directory: no HOME and no platform data directory".to_string(),
    ))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

/// A data directory can redirect to another one via a `redirect` pointer
/// file — used when a git worktree wants to share its parent repository's
/// daemon rather than spin up its own. Follows at most one hop; a redirect
/// chain is treated as a configuration error rather than resolved
/// transitively, so a typo can't silently point two worktrees at each other.
pub fn follow_redirect(data_dir: &Path) -> Result<PathBuf> {
    let redirect_file = data_dir.join("redirect");
    match std::fs::read_to_string(&redirect_file) {
        Ok(target) => {
            let target = target.trim();
            if target.is_empty() {
                return Err(Error::Config(format!(
                    "{} is empty",
                    redirect_file.display()
                )));
            }
            Ok(expand_tilde(target))
        }
        Err(ref err) if err.kind() == std::io::ErrorKind::NotFound => Ok(data_dir.to_path_buf()),
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync_remote: Option<String>,
    pub sync_branch: String,
    pub sync_interval_secs: u64,
    pub socket_path: Option<String>,
    pub listen_addr: Option<String>,
    pub origin_daemon_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_remote: None,
            sync_branch: thrum_sync::DEFAULT_BRANCH.to_string(),
            sync_interval_secs: thrum_sync::DEFAULT_INTERVAL.as_secs(),
            socket_path: None,
            listen_addr: None,
            origin_daemon_id: None,
        }
    }
}

impl Config {
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE_NAME)
    }

    /// Load config from `data_dir`, returning defaults if no `config.json`
    /// exists yet rather than erroring — a fresh data directory is a normal
    /// first-run state, not a misconfiguration.
    pub fn load_from(data_dir: &Path) -> Result<Self> {
        let path = Self::default_path(data_dir);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(ref err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save_to(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let path = Self::default_path(data_dir);
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.sync_branch, thrum_sync::DEFAULT_BRANCH);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.sync_remote = Some("origin".to_string());
        config.save_to(dir.path()).unwrap();

        let loaded = Config::load_from(dir.path()).unwrap();
        assert_eq!(loaded.sync_remote, Some("origin".to_string()));
    }

    #[test]
    fn no_redirect_file_resolves_to_itself() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(follow_redirect(dir.path()).unwrap(), dir.path());
    }

    #[test]
    fn redirect_file_points_elsewhere() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("redirect"), "/tmp/other-thrum\n").unwrap();
        assert_eq!(follow_redirect(dir.path()).unwrap(), PathBuf::from("/tmp/other-thrum"));
    }
}
