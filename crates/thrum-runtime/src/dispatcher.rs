use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use thrum_types::{Message, Scope, SubscriptionFilter};
use tokio::sync::mpsc;

/// Bound on a connection's outbound notification queue. A slow subscriber
/// (paused client, dead socket not yet detected) backs up to this many
/// pending notifications before it is dropped — better than unbounded
/// buffering, which would let one stuck client grow daemon memory without
/// limit.
pub const CONNECTION_QUEUE_CAPACITY: usize = 256;

pub type ConnectionId = u64;

/// A live-updated event pushed to subscribers: new messages, reads, and
/// session/group lifecycle changes. Carried as pre-serialized JSON so the
/// dispatcher doesn't need to know each transport's wire framing.
#[derive(Debug, Clone)]
pub struct Notification {
    pub method: &'static str,
    pub payload: serde_json::Value,
}

struct Connection {
    sender: mpsc::Sender<Notification>,
    filters: Vec<SubscriptionFilter>,
}

/// Fans live notifications out to every connection whose subscription
/// filters match. One registry shared by both transports (Unix socket and
/// WebSocket) so a message sent over one reaches subscribers on the other.
pub struct Dispatcher {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new connection with no filters (receives only broadcasts
    /// until it subscribes). Returns the connection's id and the receiving
    /// half of its notification channel.
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<Notification>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(CONNECTION_QUEUE_CAPACITY);
        let mut connections = self.connections.write().unwrap_or_else(|e| e.into_inner());
        connections.insert(id, Connection { sender, filters: Vec::new() });
        (id, receiver)
    }

    pub fn unregister(&self, id: ConnectionId) {
        let mut connections = self.connections.write().unwrap_or_else(|e| e.into_inner());
        connections.remove(&id);
    }

    pub fn add_filter(&self, id: ConnectionId, filter: SubscriptionFilter) {
        let mut connections = self.connections.write().unwrap_or_else(|e| e.into_inner());
        if let Some(conn) = connections.get_mut(&id) {
            conn.filters.push(filter);
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Deliver a `message.create` notification to every connection whose
    /// filters match any of the message's scopes, or which has no filters
    /// at all (a bare subscription is a firehose). A connection whose
    /// queue is full is treated as stalled and dropped — the caller should
    /// have it reconnect and replay from its last seen message id instead
    /// of risking unbounded memory growth here.
    pub fn publish_message(&self, message: &Message) {
        self.publish(Notification {
            method: "message.created",
            payload: serde_json::json!({ "message": message }),
        }, &message.scopes);
    }

    pub fn publish(&self, notification: Notification, scopes: &[Scope]) {
        let mut stalled = Vec::new();
        {
            let connections = self.connections.read().unwrap_or_else(|e| e.into_inner());
            for (id, conn) in connections.iter() {
                if !matches_any(&conn.filters, scopes) {
                    continue;
                }
                if conn.sender.try_send(notification.clone()).is_err() {
                    stalled.push(*id);
                }
            }
        }
        for id in stalled {
            tracing::warn!(connection_id = id, "dropping stalled subscriber");
            self.unregister(id);
        }
    }
}

fn matches_any(filters: &[SubscriptionFilter], scopes: &[Scope]) -> bool {
    if filters.is_empty() {
        return true;
    }
    filters.iter().any(|filter| {
        if filter.is_wildcard() {
            return true;
        }
        scopes.iter().any(|scope| {
            let kind_matches = filter
                .scope_kind
                .map(|k| k == scope.kind)
                .unwrap_or(true);
            let value_matches = filter
                .scope_value
                .as_deref()
                .map(|v| v == scope.value)
                .unwrap_or(true);
            kind_matches && value_matches
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrum_types::{AgentName, MessageFormat, ScopeKind};

    fn sample_message(scope_value: &str) -> Message {
        Message {
            id: thrum_ids_test_id(),
            author: AgentName::from_validated("alice"),
            content: "hi".to_string(),
            format: MessageFormat::Text,
            scopes: vec![Scope {
                kind: ScopeKind::Agent,
                value: scope_value.to_string(),
            }],
            refs: vec![],
            reply_to: None,
            acting_as: None,
            disclosed: false,
            created_at: chrono::Utc::now(),
            edited_at: None,
            deleted: false,
            delete_reason: None,
        }
    }

    fn thrum_ids_test_id() -> thrum_types::MessageId {
        thrum_types::MessageId::from_raw("msg_test")
    }

    #[tokio::test]
    async fn unfiltered_connection_receives_every_publish() {
        let dispatcher = Dispatcher::new();
        let (_id, mut rx) = dispatcher.register();
        dispatcher.publish_message(&sample_message("bob"));
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn filtered_connection_only_receives_matching_scope() {
        let dispatcher = Dispatcher::new();
        let (id, mut rx) = dispatcher.register();
        dispatcher.add_filter(
            id,
            SubscriptionFilter {
                scope_kind: Some(ScopeKind::Agent),
                scope_value: Some("bob".to_string()),
                mention_of: None,
            },
        );
        dispatcher.publish_message(&sample_message("carol"));
        assert!(rx.try_recv().is_err());

        dispatcher.publish_message(&sample_message("bob"));
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn stalled_connection_is_dropped_on_overflow() {
        let dispatcher = Dispatcher::new();
        let (_id, _rx) = dispatcher.register();
        assert_eq!(dispatcher.connection_count(), 1);
        for _ in 0..CONNECTION_QUEUE_CAPACITY + 10 {
            dispatcher.publish_message(&sample_message("bob"));
        }
        assert_eq!(dispatcher.connection_count(), 0);
    }
}
