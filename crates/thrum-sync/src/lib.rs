//! Git-backed journal replication: a dedicated orphan branch, plumbing-level
//! commits, and a set-union-by-event-id merge, so daemons sharing a repo
//! converge on the same event history without touching the repo's real
//! history.

pub mod error;
mod git;
mod lock;
mod merge;
mod worker;

pub use error::{Error, Result};
pub use git::GitRunner;
pub use lock::SyncLock;
pub use merge::union_by_event_id;
pub use worker::{SyncConfig, SyncWorker, DEFAULT_BRANCH, DEFAULT_INTERVAL};
