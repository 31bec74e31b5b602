use crate::dispatch::dispatch_one;
use crate::envelope::{RpcResponse, INVALID_REQUEST, PARSE_ERROR};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thrum_runtime::AppState;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, warn};

const READ_DEADLINE: Duration = Duration::from_secs(10);
/// Platform `sockaddr_un` paths top out around 104-108 bytes; stay well
/// clear of that so callers on macOS don't silently truncate the path.
const MAX_SOCKET_PATH_BYTES: usize = 104;

pub fn socket_path(data_dir: &Path) -> PathBuf {
    data_dir.join("thrum.sock")
}

pub fn check_socket_path_length(path: &Path) -> thrum_types::Result<()> {
    let len = path.as_os_str().len();
    if len > MAX_SOCKET_PATH_BYTES {
        return Err(thrum_types::Error::internal(std::io::Error::other(
            format!("socket path {len} bytes exceeds the {MAX_SOCKET_PATH_BYTES} byte platform limit: {}", path.display()),
        )));
    }
    Ok(())
}

/// Accepts connections on `path` forever, handling each on its own task.
/// Each connection may carry multiple newline-framed requests; the reader
/// loop exits (closing the connection) on EOF, a malformed line, or once
/// `READ_DEADLINE` elapses without a new line arriving.
pub async fn serve(path: &Path, state: Arc<AppState>) -> std::io::Result<()> {
    check_socket_path_length(path)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let _ = std::fs::remove_file(path);
    let listener = UnixListener::bind(path)?;
    tracing::info!(path = %path.display(), "unix socket listening");

    loop {
        let (stream, _addr) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, &state).await {
                debug!(error = %err, "unix connection ended");
            }
        });
    }
}

async fn handle_connection(stream: UnixStream, state: &AppState) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = match tokio::time::timeout(READ_DEADLINE, lines.next_line()).await {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => return Ok(()),
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                debug!("unix connection idle past read deadline, closing");
                return Ok(());
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Ok(raw) => dispatch_one(state, raw).await,
            Err(err) => RpcResponse::err(Value::Null, PARSE_ERROR, format!("invalid JSON: {err}")),
        };

        let mut payload = match serde_json::to_vec(&response) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "failed to serialize response");
                serde_json::to_vec(&RpcResponse::err(Value::Null, INVALID_REQUEST, "internal serialization failure"))
                    .unwrap_or_default()
            }
        };
        payload.push(b'\n');
        writer.write_all(&payload).await?;
        writer.flush().await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader as TokioBufReader};

    #[tokio::test]
    async fn round_trips_a_health_request() {
        let dir = TempDir::new().unwrap();
        let state = Arc::new(thrum_runtime::open_with_identity(dir.path(), "r_test", "alice").unwrap());
        let sock_path = dir.path().join("thrum.sock");

        let server_state = Arc::clone(&state);
        let server_path = sock_path.clone();
        tokio::spawn(async move {
            let _ = serve(&server_path, server_state).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut stream = UnixStream::connect(&sock_path).await.unwrap();
        stream
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"health\"}\n")
            .await
            .unwrap();

        let mut reader = TokioBufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let response: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(response["result"]["status"], "ok");
    }
}
