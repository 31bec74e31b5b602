use super::convert::message_json;
use super::params::{optional_array, optional_str, optional_u64, require_str};
use crate::state::AppState;
use serde_json::{json, Value};
use thrum_types::{
    EventPayload, EventRecord, Error, MessageFormat, MessageId, Reference, Result, Scope, ScopeKind,
    EVERYONE_GROUP,
};

const DEFAULT_LIST_LIMIT: u32 = 50;

fn parse_scope_kind(raw: &str) -> Result<ScopeKind> {
    serde_json::from_value(Value::String(raw.to_string()))
        .map_err(|_| Error::validation(format!("unknown scope type '{raw}'")))
}

fn parse_scopes(value: &[Value]) -> Result<Vec<Scope>> {
    value
        .iter()
        .map(|entry| {
            let kind = parse_scope_kind(require_str(entry, "type")?)?;
            let value = require_str(entry, "value")?.to_string();
            Ok(Scope { kind, value })
        })
        .collect()
}

fn parse_refs(value: &[Value]) -> Result<Vec<Reference>> {
    value
        .iter()
        .map(|entry| {
            let kind = serde_json::from_value(Value::String(require_str(entry, "type")?.to_string()))
                .map_err(|_| Error::validation("unknown reference type"))?;
            let value = require_str(entry, "value")?.to_string();
            Ok(Reference { kind, value })
        })
        .collect()
}

/// Resolve recipient scopes to `(kind, value, warning)`, validating that at
/// least one identity-bearing scope (agent/role/group) resolves to a real
/// recipient. Module/worktree scopes are routing tags, not recipients, and
/// never block a send.
fn validate_recipients(state: &AppState, scopes: &[Scope]) -> Result<Vec<String>> {
    let mut warnings = Vec::new();
    let mut identity_scopes = 0usize;
    let mut known_identity_scopes = 0usize;

    for scope in scopes {
        match scope.kind {
            ScopeKind::Agent => {
                identity_scopes += 1;
                if state.database().agent_exists(&scope.value)? {
                    known_identity_scopes += 1;
                }
            }
            ScopeKind::Role => {
                identity_scopes += 1;
                let members = state.database().agents_by_role(&scope.value)?;
                if !members.is_empty() {
                    known_identity_scopes += 1;
                    warnings.push(format!(
                        "role '{}' expanded to {} agent(s)",
                        scope.value,
                        members.len()
                    ));
                }
            }
            ScopeKind::Group => {
                identity_scopes += 1;
                if scope.value == EVERYONE_GROUP || state.database().get_group_by_name(&scope.value)?.is_some() {
                    known_identity_scopes += 1;
                }
            }
            ScopeKind::Module | ScopeKind::Worktree => {}
        }
    }

    if identity_scopes > 0 && known_identity_scopes == 0 {
        return Err(Error::precondition("all recipients unknown"));
    }
    Ok(warnings)
}

pub async fn send(state: &AppState, params: Value) -> Result<Value> {
    let caller = require_str(&params, "caller")?;
    let content = require_str(&params, "content")?;
    let format = match optional_str(&params, "format") {
        Some("markdown") => MessageFormat::Markdown,
        _ => MessageFormat::Text,
    };
    let scopes = parse_scopes(optional_array(&params, "scopes"))?;
    let refs = parse_refs(optional_array(&params, "refs"))?;
    let reply_to = optional_str(&params, "reply_to").map(MessageId::from_raw);
    let acting_as = optional_str(&params, "acting_as").map(str::to_string);
    let disclosed = super::params::optional_bool(&params, "disclosed").unwrap_or(false);

    if !state.database().agent_exists(caller)? {
        return Err(Error::not_found(format!("unknown agent '{caller}'")));
    }
    if state.database().list_sessions_for_agent(caller)?.iter().all(|s| s.state != "active") {
        return Err(Error::precondition(format!("'{caller}' has no active session")));
    }

    let warnings = validate_recipients(state, &scopes)?;

    let message_id = thrum_ids::new_message_id();
    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::MessageCreate {
            message_id: message_id.clone(),
            author: thrum_types::AgentName::from_validated(caller),
            content: content.to_string(),
            format,
            scopes,
            refs,
            reply_to,
            acting_as,
            disclosed,
        },
    );
    state.commit(record).await?;

    let stored = state
        .database()
        .get_message(message_id.as_str())?
        .ok_or_else(|| Error::internal(std::io::Error::other("message missing after send")))?;
    state.dispatcher().publish(
        crate::dispatcher::Notification {
            method: "message.created",
            payload: json!({ "message": message_json(&stored) }),
        },
        &stored
            .scopes
            .iter()
            .map(|(kind, value)| thrum_types::Scope {
                kind: parse_scope_kind(kind).unwrap_or(ScopeKind::Agent),
                value: value.clone(),
            })
            .collect::<Vec<_>>(),
    );

    Ok(json!({ "message_id": message_id, "warnings": warnings }))
}

pub async fn get(state: &AppState, params: Value) -> Result<Value> {
    let id = require_str(&params, "id")?;
    let message = state
        .database()
        .get_message(id)?
        .ok_or_else(|| Error::not_found(format!("unknown message '{id}'")))?;
    Ok(message_json(&message))
}

/// Recipient scope pairs for an agent: itself, its role, and every group it
/// is a (possibly transitive) member of.
pub(super) fn recipient_scope_pairs(state: &AppState, agent: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = vec![("agent".to_string(), agent.to_string())];
    let record = state.database().get_agent(agent)?;
    let role = record.as_ref().and_then(|a| a.role.clone());
    if let Some(role) = &role {
        pairs.push(("role".to_string(), role.clone()));
    }
    let group_ids = thrum_engine::resolve_agent_memberships(state.database(), agent, role.as_deref())?;
    if !group_ids.is_empty() {
        for (id, name) in state.database().list_groups()? {
            if group_ids.contains(&id) {
                pairs.push(("group".to_string(), name));
            }
        }
    }
    pairs.push(("group".to_string(), EVERYONE_GROUP.to_string()));
    Ok(pairs)
}

pub async fn list(state: &AppState, params: Value) -> Result<Value> {
    let agent = require_str(&params, "for_agent")?;
    let created_after = optional_str(&params, "created_after");
    let limit = optional_u64(&params, "limit").map(|n| n as u32).unwrap_or(DEFAULT_LIST_LIMIT);
    // Lets a polling caller (`thrum wait`) pair `created_after` with the ids
    // it has already consumed, so two messages minted in the same
    // millisecond never both land on the wrong side of the same poll.
    let seen: Vec<String> = optional_array(&params, "seen")
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    let pairs = recipient_scope_pairs(state, agent)?;
    let messages = state.database().list_messages(&pairs, created_after, &seen, limit)?;
    Ok(json!({ "messages": messages.iter().map(message_json).collect::<Vec<_>>() }))
}

pub async fn edit(state: &AppState, params: Value) -> Result<Value> {
    let id = require_str(&params, "id")?;
    let caller = require_str(&params, "caller")?;
    let new_content = require_str(&params, "new_content")?;

    let message = state
        .database()
        .get_message(id)?
        .ok_or_else(|| Error::not_found(format!("unknown message '{id}'")))?;
    if message.author != caller {
        return Err(Error::precondition("only the author may edit a message"));
    }

    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::MessageEdit {
            message_id: MessageId::from_raw(id),
            new_content: new_content.to_string(),
        },
    );
    state.commit(record).await?;
    Ok(json!({ "ok": true }))
}

pub async fn delete(state: &AppState, params: Value) -> Result<Value> {
    let id = require_str(&params, "id")?;
    let caller = require_str(&params, "caller")?;
    let reason = optional_str(&params, "reason").map(str::to_string);

    let message = state
        .database()
        .get_message(id)?
        .ok_or_else(|| Error::not_found(format!("unknown message '{id}'")))?;
    if message.author != caller {
        return Err(Error::precondition("only the author may delete a message"));
    }

    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::MessageDelete {
            message_id: MessageId::from_raw(id),
            reason,
        },
    );
    state.commit(record).await?;
    Ok(json!({ "ok": true }))
}

pub async fn mark_read(state: &AppState, params: Value) -> Result<Value> {
    let id = require_str(&params, "id")?;
    let reader = require_str(&params, "reader")?;
    if state.database().get_message(id)?.is_none() {
        return Err(Error::not_found(format!("unknown message '{id}'")));
    }
    let record = EventRecord::new(
        thrum_ids::new_event_id(),
        state.identity().repo_id.clone(),
        EventPayload::MessageMarkRead {
            message_id: MessageId::from_raw(id),
            reader: thrum_types::AgentName::from_validated(reader),
        },
    );
    state.commit(record).await?;
    Ok(json!({ "ok": true }))
}
