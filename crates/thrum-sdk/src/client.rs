use crate::error::{Error, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thrum_runtime::AppState;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

enum Transport {
    /// Calls go straight through the method dispatch table, no socket round
    /// trip — for embedding the daemon in the same process (tests, a
    /// single-binary tool that wants the substrate without a subprocess).
    Local(Arc<AppState>),
    /// Calls are JSON-RPC requests written to a daemon's Unix socket, one
    /// per line, matching `thrum-rpc`'s framing.
    Socket(PathBuf),
}

/// A handle to a thrum daemon, either embedded in this process or reached
/// over its Unix socket. Every RPC method in the surface is reachable
/// through [`Client::call`]; the methods beyond it are ergonomic wrappers
/// over the handful of operations most callers need typed.
pub struct Client {
    transport: Transport,
    next_id: AtomicU64,
}

impl Client {
    pub fn local(state: Arc<AppState>) -> Self {
        Self {
            transport: Transport::Local(state),
            next_id: AtomicU64::new(1),
        }
    }

    /// Opens (or initializes) a daemon's state directly at `data_dir` and
    /// wraps it as a local client, minting `agent_name`'s identity if this
    /// is the first open.
    pub fn open(data_dir: impl Into<PathBuf>, repo_id: &str, agent_name: &str) -> Result<Self> {
        let state = thrum_runtime::open_with_identity(data_dir, repo_id, agent_name)
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self::local(Arc::new(state)))
    }

    pub fn socket(path: impl Into<PathBuf>) -> Self {
        Self {
            transport: Transport::Socket(path.into()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Invokes any method in the closed RPC surface with raw JSON params,
    /// returning the raw JSON result. This is the escape hatch every typed
    /// wrapper below is built on.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        match &self.transport {
            Transport::Local(state) => thrum_runtime::handlers::dispatch(state, method, params)
                .await
                .map_err(Error::from),
            Transport::Socket(path) => self.call_over_socket(path, method, params).await,
        }
    }

    async fn call_over_socket(&self, path: &Path, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        let mut line = serde_json::to_vec(&request).map_err(|e| Error::Transport(e.to_string()))?;
        line.push(b'\n');

        let mut stream = UnixStream::connect(path)
            .await
            .map_err(|e| Error::Transport(format!("connecting to {}: {e}", path.display())))?;
        stream
            .write_all(&line)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let mut reader = BufReader::new(stream);
        let mut response_line = String::new();
        reader
            .read_line(&mut response_line)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        if response_line.is_empty() {
            return Err(Error::Transport("connection closed before a response arrived".to_string()));
        }

        let response: Value = serde_json::from_str(&response_line)
            .map_err(|e| Error::Transport(format!("malformed response: {e}")))?;
        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(Error::Transport(message));
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    pub async fn health(&self) -> Result<Value> {
        self.call("health", Value::Null).await
    }

    pub async fn agent_register(
        &self,
        name: &str,
        role: &str,
        module: &str,
    ) -> Result<Value> {
        self.call(
            "agent.register",
            json!({ "name": name, "role": role, "module": module }),
        )
        .await
    }

    pub async fn session_start(&self, agent: &str) -> Result<Value> {
        self.call("session.start", json!({ "agent": agent })).await
    }

    pub async fn session_end(&self, session_id: &str, reason: &str) -> Result<Value> {
        self.call(
            "session.end",
            json!({ "session_id": session_id, "reason": reason }),
        )
        .await
    }

    pub async fn message_send(
        &self,
        caller: &str,
        content: &str,
        scopes: Vec<Value>,
    ) -> Result<Value> {
        self.call(
            "message.send",
            json!({ "caller": caller, "content": content, "scopes": scopes }),
        )
        .await
    }

    pub async fn message_list(&self, agent: &str) -> Result<Value> {
        self.call("message.list", json!({ "for_agent": agent })).await
    }

    pub async fn team_list(&self) -> Result<Value> {
        self.call("team.list", Value::Null).await
    }

    pub async fn context_save(&self, agent: &str, fields: Value) -> Result<Value> {
        let mut params = fields;
        if let Value::Object(map) = &mut params {
            map.insert("agent".to_string(), json!(agent));
        }
        self.call("context.save", params).await
    }

    pub async fn sync(&self, force: bool) -> Result<Value> {
        self.call("sync", json!({ "force": force })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn local_client_round_trips_health() {
        let dir = TempDir::new().unwrap();
        let client = Client::open(dir.path(), "r_test", "alice").unwrap();
        let result = client.health().await.unwrap();
        assert_eq!(result["status"], "ok");
    }

    #[tokio::test]
    async fn local_client_registers_and_lists_agents() {
        let dir = TempDir::new().unwrap();
        let client = Client::open(dir.path(), "r_test", "alice").unwrap();
        client.agent_register("alice", "worker", "core").await.unwrap();
        let roster = client.team_list().await.unwrap();
        assert_eq!(roster["roster"].as_array().unwrap().len(), 1);
    }
}
