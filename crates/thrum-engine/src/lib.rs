//! Projects journal events into the SQLite projection store: idempotent
//! application, out-of-order message edit/delete buffering, cycle-safe group
//! resolution, and full/incremental replay.

pub mod error;
mod groups;
mod projector;
mod replay;

pub use error::{Error, Result};
pub use groups::{resolve_agent_memberships, resolve_group_members, would_create_cycle};
pub use projector::Projector;
pub use replay::{replay_all, replay_since};
