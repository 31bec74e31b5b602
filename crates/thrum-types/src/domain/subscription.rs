use crate::domain::message::ScopeKind;
use crate::ids::SessionId;
use serde::{Deserialize, Serialize};

/// A subscription's interest filter. `NULL` (`None`) fields act as
/// wildcards and match any scope or role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SubscriptionFilter {
    #[serde(default)]
    pub scope_kind: Option<ScopeKind>,
    #[serde(default)]
    pub scope_value: Option<String>,
    #[serde(default)]
    pub mention_of: Option<String>,
}

impl SubscriptionFilter {
    pub fn is_wildcard(&self) -> bool {
        self.scope_kind.is_none() && self.scope_value.is_none() && self.mention_of.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub session_id: SessionId,
    pub filter: SubscriptionFilter,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
