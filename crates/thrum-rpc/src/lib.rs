pub mod dispatch;
pub mod envelope;
pub mod unix;
pub mod ws;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use thrum_runtime::AppState;

/// Runs the Unix socket listener and the WebSocket server concurrently until
/// either exits (normally only on a bind failure — both loops are otherwise
/// infinite). Used by the daemon binary's main task.
pub async fn serve(
    data_dir: &Path,
    ws_addr: SocketAddr,
    state: Arc<AppState>,
) -> std::io::Result<()> {
    let sock_path = unix::socket_path(data_dir);
    let unix_state = Arc::clone(&state);
    let unix_task = tokio::spawn(async move { unix::serve(&sock_path, unix_state).await });

    let app = ws::router(state);
    let listener = tokio::net::TcpListener::bind(ws_addr).await?;
    tracing::info!(addr = %ws_addr, "websocket listening");
    let ws_task = tokio::spawn(async move { axum::serve(listener, app).await });

    let join_err = |_| std::io::Error::other("server task panicked");
    tokio::select! {
        res = unix_task => res.map_err(join_err)??,
        res = ws_task => res.map_err(join_err)??,
    }
    Ok(())
}
