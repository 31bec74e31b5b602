use crate::error::{Error, Result};
use crate::layout::{self, JournalFileKey};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thrum_types::EventRecord;

/// Guards against a corrupt or adversarial journal line consuming unbounded
/// memory; no legitimate record approaches this size.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// A restartable position within the journal: how far into each file this
/// reader has already consumed. Persist this (e.g. in the projection store)
/// across restarts to resume a scan without re-reading from the beginning.
#[derive(Debug, Clone, Default)]
pub struct JournalCursor {
    offsets: HashMap<JournalFileKey, u64>,
}

impl JournalCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self, key: &JournalFileKey) -> u64 {
        self.offsets.get(key).copied().unwrap_or(0)
    }

    pub fn set_offset(&mut self, key: JournalFileKey, offset: u64) {
        self.offsets.insert(key, offset);
    }
}

pub struct ScannedRecord {
    pub file: JournalFileKey,
    pub record: EventRecord,
}

/// Read every new line appended since `cursor` across `events.jsonl` and
/// every `messages/<author>.jsonl`, advancing `cursor` in place. Safe to call
/// repeatedly (e.g. on a poll tick or after a sync pull): a call with no new
/// data returns an empty vector and leaves the cursor untouched.
pub fn scan_since(data_dir: &Path, cursor: &mut JournalCursor) -> Result<Vec<ScannedRecord>> {
    let mut out = Vec::new();

    scan_file(
        &layout::events_path(data_dir),
        JournalFileKey::events(),
        cursor,
        &mut out,
    )?;

    let messages_dir = layout::messages_dir(data_dir);
    if messages_dir.is_dir() {
        let mut authors: Vec<String> = std::fs::read_dir(&messages_dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                name.strip_suffix(".jsonl").map(|s| s.to_string())
            })
            .collect();
        authors.sort();
        for author in authors {
            scan_file(
                &layout::message_author_path(data_dir, &author),
                JournalFileKey::message_author(&author),
                cursor,
                &mut out,
            )?;
        }
    }

    Ok(out)
}

/// Replay every record in the journal from the very start, ignoring any
/// existing cursor position. Used at startup and after a sync pull rewrites
/// history via the set-union merge.
pub fn scan_all(data_dir: &Path) -> Result<Vec<ScannedRecord>> {
    let mut cursor = JournalCursor::new();
    scan_since(data_dir, &mut cursor)
}

fn scan_file(
    path: &Path,
    key: JournalFileKey,
    cursor: &mut JournalCursor,
    out: &mut Vec<ScannedRecord>,
) -> Result<()> {
    let Ok(mut file) = std::fs::File::open(path) else {
        return Ok(());
    };

    let start = cursor.offset(&key);
    let len = file.metadata()?.len();
    if start > len {
        // File was truncated or replaced (e.g. by a sync pull); rescan it
        // from the beginning rather than erroring.
        cursor.set_offset(key.clone(), 0);
        return scan_file(path, key, cursor, out);
    }
    if start == len {
        return Ok(());
    }

    file.seek(SeekFrom::Start(start))?;
    let mut reader = BufReader::new(file);
    let mut position = start;

    loop {
        let mut buf = Vec::new();
        let (read, newline_terminated) = read_line_limited(&mut reader, &mut buf, path)?;
        if read == 0 {
            break;
        }
        position += read as u64;

        let trimmed = trim_newline(&buf);
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_slice::<EventRecord>(trimmed) {
            Ok(record) => out.push(ScannedRecord {
                file: key.clone(),
                record,
            }),
            Err(err) if !newline_terminated => {
                // A crash between the content write and the trailing-newline
                // write (append.rs writes them as two separate calls) leaves
                // exactly this: a final chunk with no newline that doesn't
                // parse. Treat it as torn, not corrupt — log and move on.
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "skipping torn final journal line"
                );
                cursor.set_offset(key, position);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
    }

    cursor.set_offset(key, position);
    Ok(())
}

/// Reads one newline-delimited chunk, returning the byte count and whether a
/// `\n` terminated it. A chunk that ends at EOF with no `\n` is the tail of a
/// write that was interrupted mid-record (see `append.rs`'s two-part
/// content-then-newline write) — callers use the flag to tell that apart
/// from a genuinely corrupt, newline-terminated line.
fn read_line_limited<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>, path: &Path) -> Result<(usize, bool)> {
    let mut total = 0;
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok((total, false));
        }
        if let Some(pos) = available.iter().position(|&b| b == b'\n') {
            buf.extend_from_slice(&available[..=pos]);
            total += pos + 1;
            reader.consume(pos + 1);
            return Ok((total, true));
        } else {
            total += available.len();
            buf.extend_from_slice(available);
            let consumed = available.len();
            reader.consume(consumed);
        }
        if buf.len() > MAX_LINE_BYTES {
            return Err(Error::LineTooLong {
                path: path.display().to_string(),
                limit: MAX_LINE_BYTES,
            });
        }
    }
}

fn trim_newline(buf: &[u8]) -> &[u8] {
    let mut end = buf.len();
    if end > 0 && buf[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && buf[end - 1] == b'\r' {
        end -= 1;
    }
    &buf[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::append::JournalWriter;
    use thrum_ids::new_event_id;
    use thrum_types::EventPayload;

    fn sample(author: &str) -> EventRecord {
        EventRecord::new(
            new_event_id(),
            "daemon-a",
            EventPayload::MessageCreate {
                message_id: thrum_ids::new_message_id(),
                author: thrum_types::AgentName::from_validated(author),
                content: "hi".to_string(),
                format: Default::default(),
                scopes: vec![],
                refs: vec![],
                reply_to: None,
                acting_as: None,
                disclosed: false,
            },
        )
    }

    #[test]
    fn scan_since_only_returns_new_records_on_repeat_calls() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JournalWriter::new(dir.path());
        writer.append(&sample("alice")).unwrap();

        let mut cursor = JournalCursor::new();
        let first = scan_since(dir.path(), &mut cursor).unwrap();
        assert_eq!(first.len(), 1);

        let second = scan_since(dir.path(), &mut cursor).unwrap();
        assert!(second.is_empty());

        writer.append(&sample("alice")).unwrap();
        let third = scan_since(dir.path(), &mut cursor).unwrap();
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn scan_since_covers_multiple_author_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JournalWriter::new(dir.path());
        writer.append(&sample("alice")).unwrap();
        writer.append(&sample("bob")).unwrap();

        let mut cursor = JournalCursor::new();
        let records = scan_since(dir.path(), &mut cursor).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn missing_journal_files_scan_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut cursor = JournalCursor::new();
        let records = scan_since(dir.path(), &mut cursor).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn torn_final_line_is_skipped_not_errored() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let writer = JournalWriter::new(dir.path());
        writer.append(&sample("alice")).unwrap();

        // Simulate a crash between the content write and the trailing
        // newline write in `append.rs`: a dangling, non-newline-terminated,
        // unparseable tail.
        let path = layout::message_author_path(dir.path(), "alice");
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"v":1,"event_id":"evt_torn"#).unwrap();
        file.flush().unwrap();

        let mut cursor = JournalCursor::new();
        let records = scan_since(dir.path(), &mut cursor).unwrap();
        assert_eq!(records.len(), 1);
    }
}
