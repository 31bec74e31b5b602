use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::identity::Identity;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thrum_engine::Projector;
use thrum_index::Database;
use thrum_journal::{JournalCursor, JournalWriter};
use thrum_sync::{SyncConfig, SyncWorker};
use thrum_types::EventRecord;
use tokio::sync::Mutex as AsyncMutex;

/// Everything a running daemon holds: the append-only journal writer, the
/// projection store behind its idempotent projector, the live-notification
/// fan-out, the sync worker, and the on-disk config/identity that seeded all
/// of it. One `AppState` is shared (via `Arc`) across every RPC connection on
/// both transports.
pub struct AppState {
    data_dir: PathBuf,
    config: Config,
    identity: Identity,
    journal: JournalWriter,
    projector: Projector,
    dispatcher: Dispatcher,
    sync: SyncWorker,
    /// Serializes the read-journal -> project -> write-journal sequence for
    /// operations that must observe their own write immediately (e.g.
    /// `message.send` replying with the freshly created message). The
    /// journal and database each handle their own internal concurrency; this
    /// guards the handler-level compound operation instead.
    write_guard: AsyncMutex<()>,
    /// Position left by the startup replay, carried forward so a sync pull's
    /// incremental replay resumes from there instead of re-scanning the
    /// whole journal on every tick.
    replay_cursor: AsyncMutex<JournalCursor>,
    started_at: std::time::Instant,
}

impl AppState {
    /// Open (or initialize) a daemon's state at `data_dir`. `data_dir` must
    /// already be the post-redirect path — callers resolve `redirect` files
    /// before calling this.
    pub fn open(data_dir: impl Into<PathBuf>, identity: Identity) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let config = Config::load_from(&data_dir)?;
        let db_path = data_dir.join("projection.sqlite3");
        let database = Database::open(&db_path)?;
        let projector = Projector::new(database);
        let journal = JournalWriter::new(&data_dir);

        let replay_cursor = thrum_engine::replay_all(&projector, &data_dir)?;

        // `sync_remote` is unset until the operator points the daemon at one
        // (e.g. via `thrum sync set-remote`); an empty remote simply fails
        // every tick with a `last_error`, which is fine — sync is never on
        // the path of a local write.
        let sync = SyncWorker::new(
            &data_dir,
            SyncConfig {
                remote: config.sync_remote.clone().unwrap_or_default(),
                branch: config.sync_branch.clone(),
                interval: std::time::Duration::from_secs(config.sync_interval_secs),
            },
        );

        Ok(Self {
            data_dir,
            config,
            identity,
            journal,
            projector,
            dispatcher: Dispatcher::new(),
            sync,
            write_guard: AsyncMutex::new(()),
            replay_cursor: AsyncMutex::new(replay_cursor),
            started_at: std::time::Instant::now(),
        })
    }

    pub fn started_at(&self) -> std::time::Instant {
        self.started_at
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn database(&self) -> &Database {
        self.projector.database()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn sync(&self) -> &SyncWorker {
        &self.sync
    }

    /// Append `record` to the journal and apply it to the projection in one
    /// critical section, so a caller that immediately reads the projection
    /// back (to build an RPC response) always sees its own write. Returns
    /// whether the projector treated this as a newly-applied event — always
    /// true here since the event id is freshly minted, but kept for symmetry
    /// with `replay`.
    pub async fn commit(&self, record: EventRecord) -> Result<bool> {
        let _guard = self.write_guard.lock().await;
        self.journal.append(&record)?;
        let applied = self.projector.apply(&record)?;
        Ok(applied)
    }

    /// Incorporate events pulled in from a sync cycle: replay anything new
    /// since the daemon's own replay cursor into the projector, without
    /// touching the local journal (sync writes journal files directly).
    pub async fn replay_since(&self) -> Result<usize> {
        let _guard = self.write_guard.lock().await;
        let mut cursor = self.replay_cursor.lock().await;
        let applied = thrum_engine::replay_since(&self.projector, &self.data_dir, &mut cursor)?;
        Ok(applied)
    }
}

/// Opens (or initializes) the daemon state at `data_dir` for an agent whose
/// identity file doesn't exist yet, minting one from `repo_id`/`agent_name`
/// and persisting it before returning.
pub fn open_with_identity(
    data_dir: impl Into<PathBuf>,
    repo_id: &str,
    agent_name: &str,
) -> Result<AppState> {
    let data_dir = data_dir.into();
    let identity = match Identity::load(&data_dir)? {
        Some(identity) => identity,
        None => {
            let identity = Identity::new(repo_id, agent_name);
            identity.save(&data_dir)?;
            identity
        }
    };
    AppState::open(data_dir, identity)
}

pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_initializes_an_empty_projection() {
        let dir = tempfile::tempdir().unwrap();
        let state = open_with_identity(dir.path(), "r_test", "alice").unwrap();
        assert_eq!(state.identity().agent_name, "alice");
        assert!(!state.database().agent_exists("alice").unwrap());
    }

    #[tokio::test]
    async fn commit_makes_the_event_visible_through_the_projector() {
        let dir = tempfile::tempdir().unwrap();
        let state = open_with_identity(dir.path(), "r_test", "alice").unwrap();

        let record = EventRecord::new(
            thrum_ids::new_event_id(),
            "daemon-1".to_string(),
            thrum_types::EventPayload::AgentRegister {
                name: thrum_types::AgentName::from_validated("alice"),
                agent_id: "ag_test".to_string(),
                role: "worker".to_string(),
                module: "core".to_string(),
                display: None,
                hostname: None,
            },
        );
        let applied = state.commit(record).await.unwrap();
        assert!(applied);
        assert!(state.database().agent_exists("alice").unwrap());
    }
}
