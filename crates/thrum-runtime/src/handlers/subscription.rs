use super::params::{optional_str, require_str};
use crate::state::AppState;
use serde_json::{json, Value};
use thrum_types::{Error, Result, ScopeKind};

/// Subscriptions are session-scoped connection state, persisted directly to
/// the projection rather than journaled — they describe what a live
/// connection wants to hear about, not a fact about the system's history.
/// Binding the returned id to the caller's actual transport connection (so
/// the dispatcher can find its outbound channel) is the transport layer's
/// job; this handler only records the durable row.
pub async fn subscribe(state: &AppState, params: Value) -> Result<Value> {
    let session_id = require_str(&params, "session_id")?;
    if state.database().get_session(session_id)?.is_none() {
        return Err(Error::not_found(format!("unknown session '{session_id}'")));
    }
    let scope_kind = optional_str(&params, "scope_kind");
    if let Some(kind) = scope_kind {
        let _: ScopeKind = serde_json::from_value(Value::String(kind.to_string()))
            .map_err(|_| Error::validation(format!("invalid scope type '{kind}'")))?;
    }
    let scope_value = optional_str(&params, "scope_value");
    let mention_of = optional_str(&params, "mention_of");

    let id = format!("sub_{}", thrum_ids::mint_encoded());
    state.database().insert_subscription(
        &id,
        session_id,
        scope_kind,
        scope_value,
        mention_of,
        &chrono::Utc::now().to_rfc3339(),
    )?;
    Ok(json!({ "subscription_id": id }))
}

pub async fn unsubscribe(state: &AppState, params: Value) -> Result<Value> {
    let id = require_str(&params, "subscription_id")?;
    state.database().remove_subscription(id)?;
    Ok(json!({ "ok": true }))
}

pub async fn list(state: &AppState, params: Value) -> Result<Value> {
    let session_id = require_str(&params, "session_id")?;
    let ids = state.database().subscriptions_for_session(session_id)?;
    Ok(json!({ "subscriptions": ids }))
}
