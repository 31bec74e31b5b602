//! Internal testing utilities for the thrum daemon. Not intended for direct
//! use.
//!
//! - `TestWorld`: an in-process daemon, ready to register agents, start
//!   sessions and send messages without a socket.
//! - `fixtures`: standing rosters for multi-agent scenario tests.
//! - `assertions`: custom assertions over roster/inbox state.

pub mod assertions;
pub mod fixtures;
pub mod world;

pub use world::TestWorld;
