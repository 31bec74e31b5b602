use crate::error::{Error, Result};
use crate::git::GitRunner;
use crate::lock::SyncLock;
use crate::merge;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use thrum_journal::messages_dir;
use thrum_types::{SyncCheckpoint, SyncState, SyncStatus};

pub const DEFAULT_BRANCH: &str = "a-sync";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub remote: String,
    pub branch: String,
    pub interval: Duration,
}

impl SyncConfig {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            branch: DEFAULT_BRANCH.to_string(),
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Periodically reconciles this daemon's journal with its peers over a
/// dedicated orphan git branch. A tick never blocks local writers: the
/// journal's own files are append-only and independent of the working tree
/// this worker manipulates, so a slow or failing sync only delays when
/// remote events become visible, never whether local ones can be recorded.
pub struct SyncWorker {
    data_dir: PathBuf,
    config: SyncConfig,
    git: GitRunner,
    status: Mutex<SyncStatus>,
}

impl SyncWorker {
    pub fn new(data_dir: impl Into<PathBuf>, config: SyncConfig) -> Self {
        let data_dir = data_dir.into();
        Self {
            git: GitRunner::new(&data_dir),
            data_dir,
            config,
            status: Mutex::new(SyncStatus {
                state: SyncState::Idle,
                last_push_at: None,
                last_pull_at: None,
                last_error: None,
                checkpoints: Vec::new(),
            }),
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Run one reconcile cycle. Returns `Ok(())` both when it succeeds and
    /// when it politely skips (lock already held by a concurrent tick);
    /// actual failures are recorded on `status()` and logged, never
    /// propagated to callers that just want the ticker to keep going.
    pub async fn tick(&self) -> Result<()> {
        let _lock = match SyncLock::try_acquire(&self.data_dir) {
            Ok(lock) => lock,
            Err(Error::LockHeld) => {
                tracing::debug!("sync tick skipped: another sync is in progress");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        match self.run_cycle().await {
            Ok(()) => {
                self.set_state(SyncState::Idle, None);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "sync tick failed, will retry next tick");
                self.set_state(SyncState::Failed, Some(err.to_string()));
                Ok(())
            }
        }
    }

    async fn run_cycle(&self) -> Result<()> {
        self.set_state(SyncState::Running, None);
        self.git.init_if_absent().await?;
        self.git.ensure_orphan_branch(&self.config.branch).await?;
        self.git
            .configure_sparse_checkout(&["events.jsonl", "messages/**"])
            .await
            .ok();

        if self.git.has_pending_changes().await? {
            self.git.add_all().await?;
            self.git.commit("sync: local events").await?;
        }

        self.git.fetch(&self.config.remote, &self.config.branch).await?;
        let local_commit = self.git.head_commit().await?;
        let remote_commit = self
            .git
            .remote_commit(&self.config.remote, &self.config.branch)
            .await?;

        if let Some(remote_commit) = remote_commit {
            if remote_commit != local_commit {
                self.merge_remote(&local_commit, &remote_commit).await?;
                self.set_pulled_now();
            }
        }

        self.git.push(&self.config.remote, &self.config.branch).await?;
        self.set_pushed_now();
        Ok(())
    }

    async fn merge_remote(&self, local_commit: &str, remote_commit: &str) -> Result<()> {
        let mut relative_paths: BTreeSet<String> = BTreeSet::new();
        relative_paths.insert("events.jsonl".to_string());
        for author in self.local_message_authors()? {
            relative_paths.insert(format!("messages/{author}.jsonl"));
        }
        for author in self.remote_message_authors(remote_commit).await? {
            relative_paths.insert(format!("messages/{author}.jsonl"));
        }

        for rel in &relative_paths {
            let local_path = self.data_dir.join(rel);
            let local_content = std::fs::read_to_string(&local_path).unwrap_or_default();
            let remote_content = self
                .git
                .show_blob(remote_commit, rel)
                .await?
                .unwrap_or_default();
            let merged = merge::union_by_event_id(&local_content, &remote_content);
            if let Some(parent) = local_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&local_path, merged)?;
        }

        self.git.add_all().await?;
        let tree = self.git.write_tree().await?;
        let merge_commit = self
            .git
            .commit_tree_with_parents(&tree, &[local_commit, remote_commit], "sync: merge")
            .await?;
        self.git.update_ref(&self.config.branch, &merge_commit).await?;
        Ok(())
    }

    fn local_message_authors(&self) -> Result<Vec<String>> {
        let dir = messages_dir(&self.data_dir);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut authors = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str().and_then(|n| n.strip_suffix(".jsonl")) {
                authors.push(name.to_string());
            }
        }
        Ok(authors)
    }

    async fn remote_message_authors(&self, remote_commit: &str) -> Result<Vec<String>> {
        let listing = self
            .git
            .run(&["ls-tree", "-r", "--name-only", remote_commit, "--", "messages"])
            .await
            .unwrap_or_default();
        Ok(listing
            .lines()
            .filter_map(|line| line.strip_prefix("messages/"))
            .filter_map(|name| name.strip_suffix(".jsonl"))
            .map(|name| name.to_string())
            .collect())
    }

    fn set_state(&self, state: SyncState, error: Option<String>) {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        status.state = state;
        status.last_error = error;
    }

    fn set_pushed_now(&self) {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        status.last_push_at = Some(chrono::Utc::now());
    }

    fn set_pulled_now(&self) {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        status.last_pull_at = Some(chrono::Utc::now());
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn record_checkpoint(&self, checkpoint: SyncCheckpoint) {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        status.checkpoints.retain(|c| c.peer_id != checkpoint.peer_id);
        status.checkpoints.push(checkpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn init_bare_remote(dir: &Path) {
        let output = tokio::process::Command::new("git")
            .args(["init", "--quiet", "--bare"])
            .arg(dir)
            .output()
            .await
            .unwrap();
        assert!(output.status.success());
    }

    #[tokio::test]
    async fn first_tick_creates_orphan_branch_and_pushes() {
        let remote_dir = tempfile::tempdir().unwrap();
        init_bare_remote(remote_dir.path()).await;

        let data_dir = tempfile::tempdir().unwrap();
        std::fs::write(data_dir.path().join("events.jsonl"), "{\"event_id\":\"evt_a\"}\n").unwrap();

        let mut config = SyncConfig::new(remote_dir.path().to_string_lossy().to_string());
        config.branch = "a-sync".to_string();
        let worker = SyncWorker::new(data_dir.path(), config);

        worker.tick().await.unwrap();
        assert_eq!(worker.status().state, SyncState::Idle);
        assert!(worker.status().last_push_at.is_some());
    }

    #[tokio::test]
    async fn second_daemon_pulls_first_daemons_events() {
        let remote_dir = tempfile::tempdir().unwrap();
        init_bare_remote(remote_dir.path()).await;
        let remote_url = remote_dir.path().to_string_lossy().to_string();

        let data_dir_a = tempfile::tempdir().unwrap();
        std::fs::write(data_dir_a.path().join("events.jsonl"), "{\"event_id\":\"evt_a\"}\n").unwrap();
        let worker_a = SyncWorker::new(data_dir_a.path(), SyncConfig::new(remote_url.clone()));
        worker_a.tick().await.unwrap();

        let data_dir_b = tempfile::tempdir().unwrap();
        std::fs::write(data_dir_b.path().join("events.jsonl"), "{\"event_id\":\"evt_b\"}\n").unwrap();
        let worker_b = SyncWorker::new(data_dir_b.path(), SyncConfig::new(remote_url));
        worker_b.tick().await.unwrap();

        let merged = std::fs::read_to_string(data_dir_b.path().join("events.jsonl")).unwrap();
        assert!(merged.contains("evt_a"));
        assert!(merged.contains("evt_b"));
    }
}
