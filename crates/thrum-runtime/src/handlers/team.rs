use crate::state::AppState;
use serde_json::{json, Value};
use thrum_types::Result;

/// Full roster with a per-agent unread count, computed over the same
/// recipient-scope resolution `message.list` uses.
pub async fn list(state: &AppState, _params: Value) -> Result<Value> {
    let agents = state.database().list_agents(false)?;
    let mut roster = Vec::with_capacity(agents.len());
    for agent in &agents {
        let pairs = super::message::recipient_scope_pairs(state, agent.name.as_str())?;
        let unread = state.database().unread_count_for_recipient(agent.name.as_str(), &pairs)?;
        roster.push(json!({
            "agent": super::convert::agent_json(agent),
            "unread": unread,
        }));
    }
    Ok(json!({ "roster": roster }))
}
