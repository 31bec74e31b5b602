//! Append-only event log storage: the source of truth every other thrum
//! component is derived from. One shared `events.jsonl` plus one
//! `messages/<author>.jsonl` per agent, each append-locked with `fs2` so
//! concurrent daemons sharing a data directory never interleave lines.

mod append;
pub mod error;
mod layout;
mod reader;

pub use append::JournalWriter;
pub use error::{Error, Result};
pub use layout::{events_path, message_author_path, messages_dir, JournalFileKey};
pub use reader::{scan_all, scan_since, JournalCursor, ScannedRecord};
