use crate::envelope::{
    handler_error_response, request_id, validate_envelope, RpcResponse, METHOD_NOT_FOUND,
};
use serde_json::Value;
use thrum_runtime::AppState;

/// Runs one already-parsed JSON-RPC request through envelope validation, the
/// method registry, and the handler, producing the response object to send
/// back. Shared by both transports so the error-code mapping in the spec
/// (`-32600`/`-32601`/`-32000`) only lives in one place.
pub async fn dispatch_one(state: &AppState, raw: Value) -> RpcResponse {
    let id = request_id(&raw);

    if let Err((code, message)) = validate_envelope(&raw) {
        return RpcResponse::err(id, code, message);
    }

    let method = raw
        .get("method")
        .and_then(Value::as_str)
        .expect("validate_envelope guarantees a string method");
    let params = raw.get("params").cloned().unwrap_or(Value::Null);

    if !thrum_runtime::handlers::is_known_method(method) {
        return RpcResponse::err(id, METHOD_NOT_FOUND, format!("method not found: {method}"));
    }

    match thrum_runtime::handlers::dispatch(state, method, params).await {
        Ok(result) => RpcResponse::ok(id, result),
        Err(err) => handler_error_response(id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_state() -> (TempDir, AppState) {
        let dir = TempDir::new().unwrap();
        let state = thrum_runtime::open_with_identity(dir.path(), "r_test", "alice").unwrap();
        (dir, state)
    }

    #[tokio::test]
    async fn unknown_method_reports_method_not_found() {
        let (_dir, state) = test_state();
        let resp = dispatch_one(&state, json!({"jsonrpc": "2.0", "id": 1, "method": "nope"})).await;
        assert_eq!(resp.error.unwrap().code, crate::envelope::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn health_succeeds() {
        let (_dir, state) = test_state();
        let resp = dispatch_one(&state, json!({"jsonrpc": "2.0", "id": 1, "method": "health"})).await;
        assert!(resp.error.is_none());
        assert_eq!(resp.result.unwrap()["status"], "ok");
    }

    #[tokio::test]
    async fn malformed_envelope_reports_invalid_request() {
        let (_dir, state) = test_state();
        let resp = dispatch_one(&state, json!({"jsonrpc": "1.0", "method": "health"})).await;
        assert_eq!(resp.error.unwrap().code, crate::envelope::INVALID_REQUEST);
    }
}
