pub mod agent;
pub mod context;
pub mod convert;
pub mod group;
pub mod health;
pub mod message;
pub mod params;
pub mod session;
pub mod subscription;
pub mod sync_control;
pub mod team;

use crate::state::AppState;
use serde_json::Value;
use std::time::Duration;
use thrum_types::{Error, Result};

/// Per-request deadline: a handler still running after this is cancelled
/// rather than allowed to hold up its connection's reader task indefinitely.
/// Cancellation is cooperative — dropping the handler future at its next
/// `.await` point, the ordinary way an async Rust call is cancelled, rather
/// than a context value threaded through every store call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The closed method set from the RPC surface. Kept as a plain list (rather
/// than deriving it from the match arms below) so `thrum-rpc` can check
/// whether a name is in the registry at all — distinguishing "method not
/// found" from a handler-level failure on a method that does exist.
pub const METHOD_NAMES: &[&str] = &[
    "health",
    "agent.register",
    "agent.list",
    "agent.listContext",
    "agent.whoami",
    "agent.delete",
    "session.start",
    "session.end",
    "session.list",
    "session.heartbeat",
    "session.setIntent",
    "session.setTask",
    "message.send",
    "message.get",
    "message.list",
    "message.edit",
    "message.delete",
    "message.markRead",
    "group.create",
    "group.rename",
    "group.delete",
    "group.memberAdd",
    "group.memberRemove",
    "group.members",
    "team.list",
    "context.save",
    "context.show",
    "context.clear",
    "subscribe",
    "unsubscribe",
    "subscriptions.list",
    "sync",
];

pub fn is_known_method(method: &str) -> bool {
    METHOD_NAMES.contains(&method)
}

/// Routes a JSON-RPC method name to its handler, enforcing the per-request
/// deadline. Callers (the transports in `thrum-rpc`) are expected to have
/// already checked `is_known_method` and mapped an unknown name to their own
/// transport-level error; a name that reaches here and still isn't
/// recognized is treated the same as any other handler failure.
pub async fn dispatch(state: &AppState, method: &str, params: Value) -> Result<Value> {
    match tokio::time::timeout(REQUEST_TIMEOUT, dispatch_inner(state, method, params)).await {
        Ok(result) => result,
        Err(_) => Err(Error::transient(format!(
            "'{method}' exceeded the {}s request deadline",
            REQUEST_TIMEOUT.as_secs()
        ))),
    }
}

async fn dispatch_inner(state: &AppState, method: &str, params: Value) -> Result<Value> {
    match method {
        "health" => health::health(state, params).await,

        "agent.register" => agent::register(state, params).await,
        "agent.list" => agent::list(state, params).await,
        "agent.listContext" => agent::list_context(state, params).await,
        "agent.whoami" => agent::whoami(state, params).await,
        "agent.delete" => agent::delete(state, params).await,

        "session.start" => session::start(state, params).await,
        "session.end" => session::end(state, params).await,
        "session.list" => session::list(state, params).await,
        "session.heartbeat" => session::heartbeat(state, params).await,
        "session.setIntent" => session::set_intent(state, params).await,
        "session.setTask" => session::set_task(state, params).await,

        "message.send" => message::send(state, params).await,
        "message.get" => message::get(state, params).await,
        "message.list" => message::list(state, params).await,
        "message.edit" => message::edit(state, params).await,
        "message.delete" => message::delete(state, params).await,
        "message.markRead" => message::mark_read(state, params).await,

        "group.create" => group::create(state, params).await,
        "group.rename" => group::rename(state, params).await,
        "group.delete" => group::delete(state, params).await,
        "group.memberAdd" => group::member_add(state, params).await,
        "group.memberRemove" => group::member_remove(state, params).await,
        "group.members" => group::members(state, params).await,

        "team.list" => team::list(state, params).await,

        "context.save" => context::save(state, params).await,
        "context.show" => context::show(state, params).await,
        "context.clear" => context::clear(state, params).await,

        "subscribe" => subscription::subscribe(state, params).await,
        "unsubscribe" => subscription::unsubscribe(state, params).await,
        "subscriptions.list" => subscription::list(state, params).await,

        "sync" => sync_control::sync(state, params).await,

        other => Err(Error::not_found(format!("unknown method '{other}'"))),
    }
}
