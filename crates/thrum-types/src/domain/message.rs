use crate::ids::{AgentName, MessageId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    Text,
    Markdown,
}

impl Default for MessageFormat {
    fn default() -> Self {
        MessageFormat::Text
    }
}

/// A `(type, value)` routing tag attached to a message at send time.
/// Append-only per message; scopes are never removed, only added by later
/// edits to the recipient set of a *new* message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub kind: ScopeKind,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Agent,
    Role,
    Group,
    Module,
    Worktree,
}

/// An immutable cross-link such as a reply-to pointer, a mention, or a
/// thread association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    ReplyTo,
    Mention,
    Thread,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub author: AgentName,
    pub content: String,
    pub format: MessageFormat,
    pub scopes: Vec<Scope>,
    pub refs: Vec<Reference>,
    #[serde(default)]
    pub reply_to: Option<MessageId>,
    #[serde(default)]
    pub acting_as: Option<String>,
    #[serde(default)]
    pub disclosed: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub edited_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub delete_reason: Option<String>,
}

impl Message {
    /// Reads see a sentinel body and preserved metadata once tombstoned.
    pub fn display_content(&self) -> &str {
        if self.deleted {
            "[deleted]"
        } else {
            &self.content
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEdit {
    pub message_id: MessageId,
    pub old_content: String,
    pub new_content: String,
    pub edited_at: chrono::DateTime<chrono::Utc>,
}
