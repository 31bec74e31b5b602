use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Advisory, process-wide exclusive lock guarding one sync tick. Held for
/// the duration of a fetch/merge/push cycle so two daemons sharing a data
/// directory (e.g. two worktrees of the same repo) never race on the
/// orphan branch.
pub struct SyncLock {
    _file: File,
    path: PathBuf,
}

impl SyncLock {
    /// Attempt to acquire the lock without blocking. Returns
    /// `Error::LockHeld` if another process (or another in-process caller)
    /// already holds it.
    pub fn try_acquire(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(".sync.lock");
        let file = OpenOptions::new().create(true).write(true).open(&path)?;
        file.try_lock_exclusive().map_err(|_| Error::LockHeld)?;
        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self._file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let first = SyncLock::try_acquire(dir.path()).unwrap();
        assert!(SyncLock::try_acquire(dir.path()).is_err());
        drop(first);
        assert!(SyncLock::try_acquire(dir.path()).is_ok());
    }
}
