use crate::state::AppState;
use serde_json::{json, Value};
use thrum_types::Result;

pub async fn health(state: &AppState, _params: Value) -> Result<Value> {
    Ok(json!({
        "status": "ok",
        "uptime_secs": state.started_at().elapsed().as_secs(),
        "repo": state.identity().repo_id,
    }))
}
