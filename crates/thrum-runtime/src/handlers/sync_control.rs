use crate::state::AppState;
use serde_json::{json, Value};
use thrum_types::Result;

/// `sync{force}` runs a cycle inline before reporting status; a bare
/// `sync{}` just reports the last cycle's outcome. Sync failures never
/// propagate as RPC errors (per the daemon's "never block local writes on
/// sync" policy) — they surface only in `last_error`.
pub async fn sync(state: &AppState, params: Value) -> Result<Value> {
    let force = super::params::optional_bool(&params, "force").unwrap_or(false);
    if force {
        state.sync().tick().await;
        if let Err(err) = state.replay_since().await {
            tracing::warn!(error = %err, "failed to replay events pulled in by sync");
        }
    }
    let status = state.sync().status();
    Ok(json!({
        "state": status.state,
        "last_push_at": status.last_push_at,
        "last_pull_at": status.last_pull_at,
        "last_error": status.last_error,
        "checkpoints": status.checkpoints,
    }))
}
