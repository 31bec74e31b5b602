use serde_json::{json, Value};
use tempfile::TempDir;
use thrum_sdk::Client;

/// A fluent, in-process daemon for integration tests. One `TestWorld` owns
/// one temp data directory and one daemon agent identity; use
/// [`TestWorld::agent`] to get additional identities sharing the same
/// projection, the way two agents on the same repository would.
pub struct TestWorld {
    _temp_dir: TempDir,
    repo_id: String,
    client: Client,
}

impl TestWorld {
    /// Opens a fresh daemon in a new temp directory, registered as `"root"`.
    pub fn new() -> Self {
        Self::with_repo_id("r_test")
    }

    pub fn with_repo_id(repo_id: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let client =
            Client::open(temp_dir.path(), repo_id, "root").expect("failed to open daemon state");
        Self {
            _temp_dir: temp_dir,
            repo_id: repo_id.to_string(),
            client,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    /// Registers an agent and returns its canonical summary.
    pub async fn register(&self, name: &str, role: &str, module: &str) -> Value {
        self.client
            .agent_register(name, role, module)
            .await
            .unwrap_or_else(|e| panic!("registering '{name}': {e}"))
    }

    /// Registers an agent, starts a session for it, and returns the
    /// session id — the common starting point for a message-sending test.
    pub async fn active_session(&self, name: &str, role: &str, module: &str) -> String {
        self.register(name, role, module).await;
        let started = self
            .client
            .session_start(name)
            .await
            .unwrap_or_else(|e| panic!("starting session for '{name}': {e}"));
        started["id"]
            .as_str()
            .expect("session.start result missing id")
            .to_string()
    }

    /// Sends a message from `author` (who must already have an active
    /// session) to the given scope value in the `agent` scope kind.
    pub async fn send_to_agent(&self, author: &str, recipient: &str, content: &str) -> Value {
        self.client
            .message_send(
                author,
                content,
                vec![json!({ "type": "agent", "value": recipient })],
            )
            .await
            .unwrap_or_else(|e| panic!("sending message from '{author}': {e}"))
    }

    pub async fn send_to_everyone(&self, author: &str, content: &str) -> Value {
        self.client
            .message_send(author, content, vec![json!({ "type": "group", "value": "everyone" })])
            .await
            .unwrap_or_else(|e| panic!("broadcasting from '{author}': {e}"))
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}
