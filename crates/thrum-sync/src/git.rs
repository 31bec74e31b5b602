use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Thin async wrapper around shelling out to `git`, scoped to one
/// repository root. Every daemon operation on the sync branch goes through
/// this so there is exactly one place that knows how the `git` binary is
/// invoked.
#[derive(Debug, Clone)]
pub struct GitRunner {
    repo_root: PathBuf,
}

impl GitRunner {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    pub async fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .current_dir(&self.repo_root)
            .args(args)
            .output()
            .await?;
        if !output.status.success() {
            return Err(Error::GitFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Best-effort variant for probes where a non-zero exit just means "no",
    /// e.g. checking whether a ref exists.
    pub async fn run_ok(&self, args: &[&str]) -> bool {
        matches!(
            Command::new("git")
                .current_dir(&self.repo_root)
                .args(args)
                .output()
                .await,
            Ok(output) if output.status.success()
        )
    }

    pub async fn init_if_absent(&self) -> Result<()> {
        if !self.repo_root.join(".git").is_dir() {
            self.run(&["init", "--quiet"]).await?;
        }
        Ok(())
    }

    pub async fn ensure_orphan_branch(&self, branch: &str) -> Result<()> {
        let exists = self
            .run_ok(&["rev-parse", "--verify", &format!("refs/heads/{branch}")])
            .await;
        if exists {
            self.run(&["checkout", "--quiet", branch]).await?;
        } else {
            self.run(&["checkout", "--quiet", "--orphan", branch]).await?;
            self.run(&["rm", "-rf", "--cached", "--quiet", "."]).await.ok();
        }
        Ok(())
    }

    pub async fn configure_sparse_checkout(&self, patterns: &[&str]) -> Result<()> {
        self.run(&["sparse-checkout", "init", "--no-cone"]).await?;
        let mut args = vec!["sparse-checkout", "set"];
        args.extend_from_slice(patterns);
        self.run(&args).await?;
        Ok(())
    }

    pub async fn has_pending_changes(&self) -> Result<bool> {
        let status = self.run(&["status", "--porcelain"]).await?;
        Ok(!status.trim().is_empty())
    }

    pub async fn add_all(&self) -> Result<()> {
        self.run(&["add", "-A"]).await?;
        Ok(())
    }

    pub async fn commit(&self, message: &str) -> Result<String> {
        self.run(&["commit", "--quiet", "-m", message]).await?;
        self.head_commit().await
    }

    pub async fn head_commit(&self) -> Result<String> {
        self.run(&["rev-parse", "HEAD"]).await
    }

    pub async fn fetch(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&["fetch", "--quiet", remote, branch]).await?;
        Ok(())
    }

    pub async fn remote_commit(&self, remote: &str, branch: &str) -> Result<Option<String>> {
        let ok = self
            .run_ok(&["rev-parse", "--verify", &format!("refs/remotes/{remote}/{branch}")])
            .await;
        if !ok {
            return Ok(None);
        }
        Ok(Some(
            self.run(&["rev-parse", &format!("refs/remotes/{remote}/{branch}")]).await?,
        ))
    }

    pub async fn show_blob(&self, rev: &str, path: &str) -> Result<Option<String>> {
        let exists = self
            .run_ok(&["cat-file", "-e", &format!("{rev}:{path}")])
            .await;
        if !exists {
            return Ok(None);
        }
        Ok(Some(self.run(&["show", &format!("{rev}:{path}")]).await?))
    }

    pub async fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&["push", "--quiet", remote, branch]).await?;
        Ok(())
    }

    /// Plumbing-level merge commit: a commit-tree call with two parents so
    /// history records the merge without needing `git merge`'s worktree
    /// machinery, which would fight with the sparse, single-purpose
    /// checkout this branch keeps.
    pub async fn commit_tree_with_parents(
        &self,
        tree: &str,
        parents: &[&str],
        message: &str,
    ) -> Result<String> {
        let mut args = vec!["commit-tree", tree];
        for parent in parents {
            args.push("-p");
            args.push(parent);
        }
        args.push("-m");
        args.push(message);
        self.run(&args).await
    }

    pub async fn write_tree(&self) -> Result<String> {
        self.run(&["write-tree"]).await
    }

    pub async fn update_ref(&self, branch: &str, commit: &str) -> Result<()> {
        self.run(&["update-ref", &format!("refs/heads/{branch}"), commit]).await?;
        self.run(&["reset", "--quiet", "--hard", commit]).await?;
        Ok(())
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }
}
