//! Daemon-side runtime: configuration, identity, live-notification
//! dispatch, and the `AppState` that ties the journal, projection, and sync
//! worker together behind one shared handle. `thrum-rpc` and `thrum-daemon`
//! are the only intended consumers of this crate.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod state;

pub use config::Config;
pub use dispatcher::{ConnectionId, Dispatcher, Notification};
pub use error::{Error, Result};
pub use identity::Identity;
pub use state::{open_with_identity, AppState, SharedState};
