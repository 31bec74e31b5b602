use serde_json::{json, Value};
use thrum_index::{AgentRecord, MessageRecord, SessionRecord, WorkContextRecord};

pub fn agent_json(agent: &AgentRecord) -> Value {
    json!({
        "name": agent.name,
        "agent_id": agent.agent_id,
        "role": agent.role,
        "module": agent.module,
        "display": agent.display,
        "hostname": agent.hostname,
        "registered_at": agent.registered_at,
        "deleted": agent.deleted_at.is_some(),
    })
}

pub fn session_json(session: &SessionRecord) -> Value {
    json!({
        "id": session.id,
        "agent": session.agent,
        "state": session.state,
        "started_at": session.started_at,
        "last_heartbeat_at": session.last_heartbeat_at,
        "ended_at": session.ended_at,
        "end_reason": session.end_reason,
    })
}

pub fn message_json(message: &MessageRecord) -> Value {
    let scopes: Vec<Value> = message
        .scopes
        .iter()
        .map(|(kind, value)| json!({ "type": kind, "value": value }))
        .collect();
    let refs: Vec<Value> = message
        .refs
        .iter()
        .map(|(kind, value)| json!({ "type": kind, "value": value }))
        .collect();
    let content = if message.deleted { "[deleted]" } else { &message.content };
    json!({
        "id": message.id,
        "author": message.author,
        "content": content,
        "format": message.format,
        "scopes": scopes,
        "refs": refs,
        "reply_to": message.reply_to,
        "acting_as": message.acting_as,
        "disclosed": message.disclosed,
        "created_at": message.created_at,
        "edited_at": message.edited_at,
        "deleted": message.deleted,
        "delete_reason": message.delete_reason,
    })
}

pub fn work_context_json(ctx: &WorkContextRecord) -> Value {
    json!({
        "agent": ctx.agent,
        "session_id": ctx.session_id,
        "branch": ctx.branch,
        "worktree_path": ctx.worktree_path,
        "intent": ctx.intent,
        "current_task": ctx.current_task,
        "dirty_files": ctx.dirty_files,
        "updated_at": ctx.updated_at,
    })
}
