//! Core types shared by every thrum crate: the error taxonomy, identifier
//! newtypes, the projected domain model, and the journal event envelope.

pub mod domain;
pub mod error;
pub mod event;
pub mod ids;

pub use error::{Error, Result};
pub use event::{EventPayload, EventRecord, SCHEMA_VERSION};
pub use ids::{
    AgentName, EventId, GroupId, MessageId, RepoId, SessionId, SessionToken, ThreadId,
    EVERYONE_GROUP, RESERVED_AGENT_NAMES,
};

pub use domain::{
    Agent, Group, GroupMember, MemberKind, Message, MessageEdit, MessageFormat, Reference,
    ReferenceKind, Scope, ScopeKind, Session, SessionEndReason, SessionState, Subscription,
    SubscriptionFilter, SyncCheckpoint, SyncState, SyncStatus, WorkContext,
};
