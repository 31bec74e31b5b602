//! thrum-sdk: a thin Rust client for the thrum daemon.
//!
//! ```no_run
//! # async fn run() -> thrum_sdk::Result<()> {
//! let client = thrum_sdk::Client::open("/tmp/my-repo-thrum", "r_myrepo", "alice")?;
//! client.agent_register("alice", "worker", "core").await?;
//! client.message_send("alice", "hello team", vec![serde_json::json!({"type": "group", "value": "everyone"})]).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;

pub use client::Client;
pub use error::{Error, Result};
