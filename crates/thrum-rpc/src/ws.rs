use crate::dispatch::dispatch_one;
use crate::envelope::{RpcResponse, INVALID_REQUEST, PARSE_ERROR};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thrum_runtime::AppState;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const PING_INTERVAL: Duration = Duration::from_secs(54);
const READ_DEADLINE: Duration = Duration::from_secs(60);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(upgrade))
        .with_state(state)
}

async fn upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One WebSocket connection. Registers with the dispatcher unconditionally
/// so a passive UI observer is eligible for broadcast fan-out without ever
/// sending a `subscribe` call; a bound session token would additionally let
/// the client registry associate this connection with a specific agent
/// session, but that binding step is a thin layer on top — unauthenticated
/// connections are a normal, supported client shape.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (conn_id, mut notifications) = state.dispatcher().register();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(64);

    let pump_tx = outbound_tx.clone();
    let pump = tokio::spawn(async move {
        loop {
            tokio::select! {
                notification = notifications.recv() => {
                    match notification {
                        Some(n) => {
                            let text = serde_json::to_string(&serde_json::json!({
                                "jsonrpc": "2.0",
                                "method": n.method,
                                "params": n.payload,
                            }))
                            .unwrap_or_default();
                            if pump_tx.send(Message::Text(text.into())).await.is_err() {
                                return;
                            }
                        }
                        None => return,
                    }
                }
                _ = tokio::time::sleep(PING_INTERVAL) => {
                    if pump_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        return;
                    }
                }
            }
        }
    });

    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    loop {
        let next = tokio::time::timeout(READ_DEADLINE, stream.next()).await;
        let msg = match next {
            Ok(Some(Ok(msg))) => msg,
            Ok(Some(Err(err))) => {
                debug!(error = %err, "websocket read error");
                break;
            }
            Ok(None) => break,
            Err(_) => {
                debug!("websocket idle past read deadline, closing");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let response = handle_payload(&state, &text).await;
                if outbound_tx.send(Message::Text(response.into())).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    pump.abort();
    drop(writer);
    state.dispatcher().unregister(conn_id);
}

/// Parses and dispatches one WebSocket text frame, which may be a single
/// request object or a batch array. Batch responses preserve request order;
/// an empty batch is itself an invalid-request error.
async fn handle_payload(state: &AppState, text: &str) -> String {
    let parsed: Result<Value, _> = serde_json::from_str(text);
    let raw = match parsed {
        Ok(raw) => raw,
        Err(err) => {
            let resp = RpcResponse::err(Value::Null, PARSE_ERROR, format!("invalid JSON: {err}"));
            return serde_json::to_string(&resp).unwrap_or_default();
        }
    };

    if let Value::Array(items) = raw {
        if items.is_empty() {
            let resp = RpcResponse::err(Value::Null, INVALID_REQUEST, "batch must not be empty");
            return serde_json::to_string(&resp).unwrap_or_default();
        }
        let mut responses = Vec::with_capacity(items.len());
        for item in items {
            responses.push(dispatch_one(state, item).await);
        }
        return match serde_json::to_string(&responses) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "failed to serialize batch response");
                "[]".to_string()
            }
        };
    }

    let response = dispatch_one(state, raw).await;
    serde_json::to_string(&response).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_state() -> (TempDir, Arc<AppState>) {
        let dir = TempDir::new().unwrap();
        let state = Arc::new(
            thrum_runtime::open_with_identity(dir.path(), "r_test", "alice").unwrap(),
        );
        (dir, state)
    }

    #[tokio::test]
    async fn single_request_dispatches() {
        let (_dir, state) = test_state();
        let response = handle_payload(&state, r#"{"jsonrpc":"2.0","id":1,"method":"health"}"#).await;
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["result"]["status"], "ok");
    }

    #[tokio::test]
    async fn empty_batch_is_invalid_request() {
        let (_dir, state) = test_state();
        let response = handle_payload(&state, "[]").await;
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["error"]["code"], crate::envelope::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let (_dir, state) = test_state();
        let batch = json!([
            {"jsonrpc": "2.0", "id": 1, "method": "health"},
            {"jsonrpc": "2.0", "id": 2, "method": "nope"},
        ]);
        let response = handle_payload(&state, &batch.to_string()).await;
        let value: Value = serde_json::from_str(&response).unwrap();
        let arr = value.as_array().unwrap();
        assert_eq!(arr[0]["id"], 1);
        assert_eq!(arr[1]["id"], 2);
        assert!(arr[1]["error"].is_object());
    }
}
