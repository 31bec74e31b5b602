use serde::{Deserialize, Serialize};
use serde_json::Value;
use thrum_types::Error as CoreError;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const HANDLER_ERROR: i64 = -32000;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Maps a request that parsed as JSON but isn't a valid JSON-RPC 2.0 request
/// (wrong/missing version, missing method) to the appropriate framing error,
/// before the method registry is ever consulted.
pub fn validate_envelope(raw: &Value) -> Result<(), (i64, &'static str)> {
    let Some(obj) = raw.as_object() else {
        return Err((INVALID_REQUEST, "request must be a JSON object"));
    };
    match obj.get("jsonrpc").and_then(Value::as_str) {
        Some("2.0") => {}
        _ => return Err((INVALID_REQUEST, "jsonrpc must be \"2.0\"")),
    }
    if !obj.contains_key("method") || obj.get("method").and_then(Value::as_str).is_none() {
        return Err((METHOD_NOT_FOUND, "missing method"));
    }
    Ok(())
}

pub fn request_id(raw: &Value) -> Value {
    raw.get("id").cloned().unwrap_or(Value::Null)
}

/// Converts a handler-layer `thrum_types::Error` into the single JSON-RPC
/// code the surface promises for handler failures (`-32000`); the taxonomy
/// distinction (validation vs. not-found vs. conflict, ...) still survives in
/// the message text and `error.kind()` for callers that want to branch on it
/// out of band.
pub fn handler_error_response(id: Value, err: CoreError) -> RpcResponse {
    RpcResponse::err(id, HANDLER_ERROR, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_wrong_jsonrpc_version() {
        let raw = json!({"jsonrpc": "1.0", "method": "health"});
        let err = validate_envelope(&raw).unwrap_err();
        assert_eq!(err.0, INVALID_REQUEST);
    }

    #[test]
    fn rejects_missing_method() {
        let raw = json!({"jsonrpc": "2.0"});
        let err = validate_envelope(&raw).unwrap_err();
        assert_eq!(err.0, METHOD_NOT_FOUND);
    }

    #[test]
    fn accepts_well_formed_request() {
        let raw = json!({"jsonrpc": "2.0", "method": "health", "id": 1});
        assert!(validate_envelope(&raw).is_ok());
    }
}
