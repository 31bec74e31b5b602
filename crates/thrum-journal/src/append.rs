use crate::error::{Error, Result};
use crate::layout;
use fs2::FileExt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thrum_types::EventRecord;

/// Appends records to the two-file journal (`events.jsonl` plus one
/// `messages/<author>.jsonl` per author), taking an exclusive advisory lock
/// on the target file for the duration of each append so that two daemon
/// processes sharing a data directory (e.g. across worktrees) never
/// interleave partial lines.
pub struct JournalWriter {
    data_dir: PathBuf,
}

impl JournalWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Append one record, routing message lifecycle events to their
    /// author's per-author log and everything else to the shared log.
    /// Returns the path written to.
    pub fn append(&self, record: &EventRecord) -> Result<PathBuf> {
        let fallback_author;
        let path = if record.payload.is_message_event() {
            fallback_author = match &record.payload {
                thrum_types::EventPayload::MessageCreate { author, .. } => author.clone(),
                _ => thrum_types::AgentName::from_validated(
                    record
                        .origin_daemon
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string()),
                ),
            };
            std::fs::create_dir_all(layout::messages_dir(&self.data_dir))?;
            layout::message_author_path(&self.data_dir, record.payload.message_author(&fallback_author).as_str())
        } else {
            layout::events_path(&self.data_dir)
        };

        append_line(&path, &serde_json::to_string(record)?)?;
        Ok(path)
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    file.lock_exclusive()
        .map_err(|_| Error::LockContention {
            path: path.display().to_string(),
        })?;
    let result = (|| -> Result<()> {
        let mut writer = &file;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    })();
    let _ = FileExt::unlock(&file);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrum_ids::new_event_id;
    use thrum_types::EventPayload;

    fn sample_record() -> EventRecord {
        EventRecord::new(
            new_event_id(),
            "daemon-a",
            EventPayload::AgentDelete {
                name: thrum_types::AgentName::from_validated("alice"),
            },
        )
    }

    #[test]
    fn appends_non_message_events_to_shared_log() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JournalWriter::new(dir.path());
        let path = writer.append(&sample_record()).unwrap();
        assert_eq!(path, layout::events_path(dir.path()));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn routes_message_create_to_per_author_log() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JournalWriter::new(dir.path());
        let record = EventRecord::new(
            new_event_id(),
            "daemon-a",
            EventPayload::MessageCreate {
                message_id: thrum_ids::new_message_id(),
                author: thrum_types::AgentName::from_validated("bob"),
                content: "hello".to_string(),
                format: Default::default(),
                scopes: vec![],
                refs: vec![],
                reply_to: None,
                acting_as: None,
                disclosed: false,
            },
        );
        let path = writer.append(&record).unwrap();
        assert_eq!(path, layout::message_author_path(dir.path(), "bob"));
    }

    #[test]
    fn repeated_appends_accumulate_lines() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JournalWriter::new(dir.path());
        for _ in 0..5 {
            writer.append(&sample_record()).unwrap();
        }
        let contents = std::fs::read_to_string(layout::events_path(dir.path())).unwrap();
        assert_eq!(contents.lines().count(), 5);
    }
}
