use super::convert::session_json;
use super::params::require_str;
use crate::state::AppState;
use serde_json::{json, Value};
use thrum_types::{EventPayload, EventRecord, Error, Result, SessionEndReason, SessionId};

pub async fn start(state: &AppState, params: Value) -> Result<Value> {
    let agent = require_str(&params, "agent")?;
    if !state.database().agent_exists(agent)? {
        return Err(Error::not_found(format!("unknown agent '{agent}'")));
    }
    let session_id = thrum_ids::new_session_id();
    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::SessionStart {
            session_id: session_id.clone(),
            agent: thrum_types::AgentName::from_validated(agent),
        },
    );
    state.commit(record).await?;
    let session = state
        .database()
        .get_session(session_id.as_str())?
        .ok_or_else(|| Error::internal(std::io::Error::other("session missing after start")))?;
    Ok(session_json(&session))
}

pub async fn end(state: &AppState, params: Value) -> Result<Value> {
    let session_id = require_str(&params, "session_id")?;
    let session = state
        .database()
        .get_session(session_id)?
        .ok_or_else(|| Error::not_found(format!("unknown session '{session_id}'")))?;
    let reason = match super::params::optional_str(&params, "reason") {
        Some("manual_cleanup") => SessionEndReason::ManualCleanup,
        Some("automated_cleanup") => SessionEndReason::AutomatedCleanup,
        _ => SessionEndReason::Requested,
    };
    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::SessionEnd {
            session_id: SessionId::from_raw(session_id),
            reason,
        },
    );
    state.commit(record).await?;
    state.database().clear_work_context(&session.agent)?;
    state.database().remove_subscriptions_for_session(session_id)?;
    Ok(json!({ "ended": session_id }))
}

pub async fn list(state: &AppState, params: Value) -> Result<Value> {
    let agent = require_str(&params, "agent")?;
    let sessions = state.database().list_sessions_for_agent(agent)?;
    Ok(json!({ "sessions": sessions.iter().map(session_json).collect::<Vec<_>>() }))
}

pub async fn heartbeat(state: &AppState, params: Value) -> Result<Value> {
    let session_id = require_str(&params, "session_id")?;
    if state.database().get_session(session_id)?.is_none() {
        return Err(Error::not_found(format!("unknown session '{session_id}'")));
    }
    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::SessionHeartbeat {
            session_id: SessionId::from_raw(session_id),
        },
    );
    state.commit(record).await?;
    Ok(json!({ "ok": true }))
}

pub async fn set_intent(state: &AppState, params: Value) -> Result<Value> {
    let session_id = require_str(&params, "session_id")?;
    let intent = require_str(&params, "intent")?;
    if state.database().get_session(session_id)?.is_none() {
        return Err(Error::not_found(format!("unknown session '{session_id}'")));
    }
    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::SessionSetIntent {
            session_id: SessionId::from_raw(session_id),
            intent: intent.to_string(),
        },
    );
    state.commit(record).await?;
    Ok(json!({ "ok": true }))
}

pub async fn set_task(state: &AppState, params: Value) -> Result<Value> {
    let session_id = require_str(&params, "session_id")?;
    let task = require_str(&params, "task")?;
    if state.database().get_session(session_id)?.is_none() {
        return Err(Error::not_found(format!("unknown session '{session_id}'")));
    }
    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::SessionSetTask {
            session_id: SessionId::from_raw(session_id),
            task: task.to_string(),
        },
    );
    state.commit(record).await?;
    Ok(json!({ "ok": true }))
}
