use super::convert::work_context_json;
use super::params::{optional_array, optional_str, require_str};
use crate::state::AppState;
use serde_json::{json, Value};
use thrum_types::{AgentName, EventPayload, EventRecord, Result};

pub async fn save(state: &AppState, params: Value) -> Result<Value> {
    let agent = require_str(&params, "agent")?;
    let session_id = optional_str(&params, "session_id").map(|id| thrum_types::SessionId::from_raw(id));
    let branch = optional_str(&params, "branch").map(str::to_string);
    let worktree_path = optional_str(&params, "worktree_path").map(str::to_string);
    let intent = optional_str(&params, "intent").map(str::to_string);
    let current_task = optional_str(&params, "current_task").map(str::to_string);
    let dirty_files: Vec<String> = optional_array(&params, "dirty_files")
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::ContextSave {
            agent: AgentName::from_validated(agent),
            session_id,
            branch,
            worktree_path,
            intent,
            current_task,
            dirty_files,
        },
    );
    state.commit(record).await?;
    Ok(json!({ "ok": true }))
}

pub async fn show(state: &AppState, params: Value) -> Result<Value> {
    let agent = require_str(&params, "agent")?;
    let context = state.database().get_work_context(agent)?;
    Ok(json!({ "context": context.as_ref().map(work_context_json) }))
}

pub async fn clear(state: &AppState, params: Value) -> Result<Value> {
    let agent = require_str(&params, "agent")?;
    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::ContextClear {
            agent: AgentName::from_validated(agent),
        },
    );
    state.commit(record).await?;
    Ok(json!({ "ok": true }))
}
