use crate::domain::{MemberKind, MessageFormat, Reference, Scope, SessionEndReason};
use crate::ids::{AgentName, GroupId, MessageId, SessionId};
use serde::{Deserialize, Serialize};

/// The typed body of a journal line. The `type` tag is the wire value used
/// for routing to `messages/<author>.jsonl` vs `events.jsonl` and for
/// dispatch to the projector. Unknown/legacy fields on any variant (e.g. a
/// pre-removal `priority` field) are silently dropped by serde's default
/// "ignore unknown fields" behavior, matching the projector's tolerance for
/// stale records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    #[serde(rename = "agent.register")]
    AgentRegister {
        name: AgentName,
        agent_id: String,
        role: String,
        module: String,
        #[serde(default)]
        display: Option<String>,
        #[serde(default)]
        hostname: Option<String>,
    },
    #[serde(rename = "agent.delete")]
    AgentDelete { name: AgentName },

    #[serde(rename = "session.start")]
    SessionStart {
        session_id: SessionId,
        agent: AgentName,
    },
    #[serde(rename = "session.end")]
    SessionEnd {
        session_id: SessionId,
        reason: SessionEndReason,
    },
    #[serde(rename = "session.heartbeat")]
    SessionHeartbeat { session_id: SessionId },
    #[serde(rename = "session.setIntent")]
    SessionSetIntent {
        session_id: SessionId,
        intent: String,
    },
    #[serde(rename = "session.setTask")]
    SessionSetTask {
        session_id: SessionId,
        task: String,
    },

    #[serde(rename = "message.create")]
    MessageCreate {
        message_id: MessageId,
        author: AgentName,
        content: String,
        #[serde(default)]
        format: MessageFormat,
        #[serde(default)]
        scopes: Vec<Scope>,
        #[serde(default)]
        refs: Vec<Reference>,
        #[serde(default)]
        reply_to: Option<MessageId>,
        #[serde(default)]
        acting_as: Option<String>,
        #[serde(default)]
        disclosed: bool,
    },
    #[serde(rename = "message.edit")]
    MessageEdit {
        message_id: MessageId,
        new_content: String,
    },
    #[serde(rename = "message.delete")]
    MessageDelete {
        message_id: MessageId,
        #[serde(default)]
        reason: Option<String>,
    },
    #[serde(rename = "message.markRead")]
    MessageMarkRead {
        message_id: MessageId,
        reader: AgentName,
    },

    #[serde(rename = "group.create")]
    GroupCreate { group_id: GroupId, name: String },
    #[serde(rename = "group.rename")]
    GroupRename { group_id: GroupId, new_name: String },
    #[serde(rename = "group.delete")]
    GroupDelete { group_id: GroupId },
    #[serde(rename = "group.memberAdd")]
    GroupMemberAdd {
        group_id: GroupId,
        member_kind: MemberKind,
        member_value: String,
    },
    #[serde(rename = "group.memberRemove")]
    GroupMemberRemove {
        group_id: GroupId,
        member_kind: MemberKind,
        member_value: String,
    },

    #[serde(rename = "context.save")]
    ContextSave {
        agent: AgentName,
        session_id: Option<SessionId>,
        #[serde(default)]
        branch: Option<String>,
        #[serde(default)]
        worktree_path: Option<String>,
        #[serde(default)]
        intent: Option<String>,
        #[serde(default)]
        current_task: Option<String>,
        #[serde(default)]
        dirty_files: Vec<String>,
    },
    #[serde(rename = "context.clear")]
    ContextClear { agent: AgentName },
}

impl EventPayload {
    /// The wire type string, e.g. `"message.create"`. Used to pick the
    /// journal file an event is appended to (§4.2: message lifecycle events
    /// route to `messages/<author>.jsonl`, everything else to
    /// `events.jsonl`).
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::AgentRegister { .. } => "agent.register",
            EventPayload::AgentDelete { .. } => "agent.delete",
            EventPayload::SessionStart { .. } => "session.start",
            EventPayload::SessionEnd { .. } => "session.end",
            EventPayload::SessionHeartbeat { .. } => "session.heartbeat",
            EventPayload::SessionSetIntent { .. } => "session.setIntent",
            EventPayload::SessionSetTask { .. } => "session.setTask",
            EventPayload::MessageCreate { .. } => "message.create",
            EventPayload::MessageEdit { .. } => "message.edit",
            EventPayload::MessageDelete { .. } => "message.delete",
            EventPayload::MessageMarkRead { .. } => "message.markRead",
            EventPayload::GroupCreate { .. } => "group.create",
            EventPayload::GroupRename { .. } => "group.rename",
            EventPayload::GroupDelete { .. } => "group.delete",
            EventPayload::GroupMemberAdd { .. } => "group.memberAdd",
            EventPayload::GroupMemberRemove { .. } => "group.memberRemove",
            EventPayload::ContextSave { .. } => "context.save",
            EventPayload::ContextClear { .. } => "context.clear",
        }
    }

    /// Message lifecycle events are appended to the per-author journal file;
    /// everything else lands in the shared `events.jsonl`.
    pub fn is_message_event(&self) -> bool {
        matches!(
            self,
            EventPayload::MessageCreate { .. }
                | EventPayload::MessageEdit { .. }
                | EventPayload::MessageDelete { .. }
        )
    }

    /// The author whose per-author journal file a message event belongs in.
    pub fn message_author<'a>(&'a self, fallback: &'a AgentName) -> &'a AgentName {
        match self {
            EventPayload::MessageCreate { author, .. } => author,
            _ => fallback,
        }
    }
}
