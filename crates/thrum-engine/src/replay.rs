use crate::error::Result;
use crate::projector::Projector;
use std::path::Path;
use thrum_journal::JournalCursor;

/// Replay every record currently in the journal through `projector`, in
/// file order then on-disk order within each file. Used at daemon startup
/// (projection store may be stale or freshly created) and after a sync pull
/// rewrites local history via the set-union merge.
///
/// Returns the cursor positioned at end-of-journal so the caller can persist
/// it and resume with `thrum_journal::scan_since` afterwards.
pub fn replay_all(projector: &Projector, data_dir: &Path) -> Result<JournalCursor> {
    let mut cursor = JournalCursor::new();
    let records = thrum_journal::scan_since(data_dir, &mut cursor)?;
    let mut applied = 0;
    for scanned in &records {
        if projector.apply(&scanned.record)? {
            applied += 1;
        }
    }
    tracing::info!(total = records.len(), applied, "replayed journal into projection store");
    Ok(cursor)
}

/// Incremental replay from a previously saved cursor, e.g. on a sync-worker
/// tick after new events have been pulled in.
pub fn replay_since(projector: &Projector, data_dir: &Path, cursor: &mut JournalCursor) -> Result<usize> {
    let records = thrum_journal::scan_since(data_dir, cursor)?;
    let mut applied = 0;
    for scanned in &records {
        if projector.apply(&scanned.record)? {
            applied += 1;
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrum_index::Database;
    use thrum_journal::JournalWriter;
    use thrum_types::{EventPayload, EventRecord};

    #[test]
    fn replay_all_applies_every_record_in_a_fresh_journal() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JournalWriter::new(dir.path());
        for i in 0..3 {
            let record = EventRecord::new(
                thrum_ids::new_event_id(),
                "daemon-a",
                EventPayload::AgentRegister {
                    name: thrum_types::AgentName::from_validated(format!("agent{i}")),
                    agent_id: format!("agent{i}"),
                    role: "worker".to_string(),
                    module: "core".to_string(),
                    display: None,
                    hostname: None,
                },
            );
            writer.append(&record).unwrap();
        }

        let projector = Projector::new(Database::open_in_memory().unwrap());
        replay_all(&projector, dir.path()).unwrap();
        assert!(projector.database().agent_exists("agent0").unwrap());
        assert!(projector.database().agent_exists("agent2").unwrap());
    }
}
