use std::path::{Path, PathBuf};

/// Name of the shared journal file holding every non-message event.
pub const EVENTS_FILE: &str = "events.jsonl";

/// Subdirectory holding one append-only file per message author.
pub const MESSAGES_DIR: &str = "messages";

/// Resolve the path to the shared `events.jsonl` file under a data directory.
pub fn events_path(data_dir: &Path) -> PathBuf {
    data_dir.join(EVENTS_FILE)
}

/// Resolve the path to `messages/<author>.jsonl` for a given author.
pub fn message_author_path(data_dir: &Path, author: &str) -> PathBuf {
    data_dir.join(MESSAGES_DIR).join(format!("{author}.jsonl"))
}

/// The directory containing all per-author message logs.
pub fn messages_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(MESSAGES_DIR)
}

/// A stable key identifying which journal file a record lives in, used as
/// half of a restartable scan position. `"events"` for the shared log,
/// `"messages/<author>"` for a per-author log.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JournalFileKey(String);

impl JournalFileKey {
    pub fn events() -> Self {
        JournalFileKey("events".to_string())
    }

    pub fn message_author(author: &str) -> Self {
        JournalFileKey(format!("messages/{author}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn relative_path(&self) -> PathBuf {
        if self.0 == "events" {
            PathBuf::from(EVENTS_FILE)
        } else {
            PathBuf::from(format!("{}.jsonl", self.0))
        }
    }
}
