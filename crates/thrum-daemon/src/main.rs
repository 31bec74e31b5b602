use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use thrum_runtime::{open_with_identity, AppState};

/// The thrum daemon: one process per repository, holding the append-only
/// journal, the projection cache, the dual-transport RPC surface and the
/// sync worker. The CLI surface that talks to it is out of scope here — this
/// binary only ever exposes the closed RPC method set.
#[derive(Debug, Parser)]
#[command(name = "thrumd", version, about)]
struct Args {
    /// Repository data directory. Defaults to the platform data dir (or
    /// `THRUM_DATA_DIR`) joined with the repo id.
    #[arg(long)]
    data_dir: Option<String>,

    /// Opaque repository identifier this daemon serves.
    #[arg(long)]
    repo_id: String,

    /// This daemon's own registered agent name.
    #[arg(long)]
    agent_name: String,

    /// Address the WebSocket transport binds to.
    #[arg(long, default_value = "127.0.0.1:4621")]
    listen_addr: SocketAddr,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[cfg(unix)]
fn reset_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

#[tokio::main]
async fn main() {
    #[cfg(unix)]
    reset_sigpipe();

    let args = Args::parse();
    init_tracing(&args.log_level);

    if let Err(err) = run(args).await {
        tracing::error!(error = %err, "daemon exited with an error");
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = match &args.data_dir {
        Some(explicit) => thrum_runtime::config::resolve_data_dir(Some(explicit))?,
        None => thrum_runtime::config::resolve_data_dir(None)?.join(&args.repo_id),
    };
    let data_dir = thrum_runtime::config::follow_redirect(&data_dir)?;

    let state = Arc::new(open_with_identity(&data_dir, &args.repo_id, &args.agent_name)?);
    tracing::info!(
        repo = %args.repo_id,
        agent = %args.agent_name,
        data_dir = %data_dir.display(),
        "thrum daemon starting",
    );

    spawn_sync_ticker(Arc::clone(&state));

    thrum_rpc::serve(&data_dir, args.listen_addr, state).await?;
    Ok(())
}

/// Ticks the sync worker on its configured interval for as long as the
/// daemon runs. Sync failures are recorded on the worker's own status and
/// never bring the daemon down — see `thrum-sync`'s retry policy.
fn spawn_sync_ticker(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.sync().interval());
        loop {
            interval.tick().await;
            let _ = state.sync().tick().await;
            if let Err(err) = state.replay_since().await {
                tracing::warn!(error = %err, "failed to replay events pulled in by sync");
            }
        }
    });
}
