//! SQLite-backed projection store: a rebuildable cache over the journal,
//! optimized for the daemon's hot read paths (inbox resolution, thread
//! timelines, group membership).

mod db;
pub mod error;
mod schema;

pub use db::{
    AgentRecord, Database, GroupMembershipEntry, InboxEntry, MessageRecord, SessionRecord,
    SyncCheckpointRecord, WorkContextRecord,
};
pub use error::{Error, Result};
pub use schema::SCHEMA_VERSION;
