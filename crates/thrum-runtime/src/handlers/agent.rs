use super::convert::agent_json;
use super::params::{optional_str, require_str};
use crate::state::AppState;
use serde_json::{json, Value};
use thrum_types::{EventPayload, EventRecord, Error, Result};

pub async fn register(state: &AppState, params: Value) -> Result<Value> {
    let raw_name = require_str(&params, "name")?;
    let role = require_str(&params, "role")?;
    let module = require_str(&params, "module")?;
    let display = optional_str(&params, "display").map(str::to_string);
    let hostname = optional_str(&params, "hostname").map(str::to_string);

    let name = thrum_ids::validate_agent_name(raw_name)?;
    if name.as_str() == role {
        return Err(Error::validation("agent name must not equal its own role"));
    }

    let agent_id = thrum_ids::mint_role_agent_id(state.identity().repo_id.as_str(), role, module);

    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::AgentRegister {
            name: name.clone(),
            agent_id,
            role: role.to_string(),
            module: module.to_string(),
            display,
            hostname,
        },
    );
    state.commit(record).await?;

    let agent = state
        .database()
        .get_agent(name.as_str())?
        .ok_or_else(|| Error::internal(std::io::Error::other("agent missing immediately after registration")))?;
    Ok(agent_json(&agent))
}

pub async fn list(state: &AppState, params: Value) -> Result<Value> {
    let include_deleted = super::params::optional_bool(&params, "include_deleted").unwrap_or(false);
    let agents = state.database().list_agents(include_deleted)?;
    Ok(json!({ "agents": agents.iter().map(agent_json).collect::<Vec<_>>() }))
}

pub async fn list_context(state: &AppState, params: Value) -> Result<Value> {
    let name = require_str(&params, "name")?;
    let context = state.database().get_work_context(name)?;
    Ok(json!({ "context": context.as_ref().map(super::convert::work_context_json) }))
}

pub async fn whoami(state: &AppState, params: Value) -> Result<Value> {
    let name = optional_str(&params, "name").unwrap_or(state.identity().agent_name.as_str());
    let agent = state
        .database()
        .get_agent(name)?
        .ok_or_else(|| Error::not_found(format!("unknown agent '{name}'")))?;
    Ok(agent_json(&agent))
}

pub async fn delete(state: &AppState, params: Value) -> Result<Value> {
    let name = require_str(&params, "name")?;
    if !state.database().agent_exists(name)? {
        return Err(Error::not_found(format!("unknown agent '{name}'")));
    }
    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::AgentDelete {
            name: thrum_types::AgentName::from_validated(name),
        },
    );
    state.commit(record).await?;
    Ok(json!({ "deleted": name }))
}
