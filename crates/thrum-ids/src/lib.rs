//! Identifier minting, encoding and validation for the thrum daemon.
//!
//! Identifiers are 128-bit values (48-bit millisecond timestamp, 80-bit
//! randomness) rendered as 26-character Crockford base-32 strings behind a
//! type prefix, so every id sorts lexicographically in mint order.

pub mod base32;
mod mint;
pub mod name;
pub mod repo;
mod typed;

pub use mint::{mint_encoded, mint_raw};
pub use name::{mint_role_agent_id, sanitize_branch_name, validate_agent_name};
pub use repo::repo_id_from_origin_url;
pub use typed::{
    new_event_id, new_group_id, new_message_id, new_session_id, new_session_token, new_thread_id,
};
