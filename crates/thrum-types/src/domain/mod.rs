pub mod agent;
pub mod group;
pub mod message;
pub mod session;
pub mod subscription;
pub mod sync;

pub use agent::{Agent, WorkContext};
pub use group::{Group, GroupMember, MemberKind};
pub use message::{Message, MessageEdit, MessageFormat, Reference, ReferenceKind, Scope, ScopeKind};
pub use session::{Session, SessionEndReason, SessionState};
pub use subscription::{Subscription, SubscriptionFilter};
pub use sync::{SyncCheckpoint, SyncState, SyncStatus};
