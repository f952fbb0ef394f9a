//! logmeter entry point
//!
//! Loads programs, starts the tailer and dispatcher tasks, and serves the
//! metric store over HTTP until interrupted.

use std::sync::Arc;

use logmeter_api::{init_tracing, router, tail_files, ApiError, ApiResult, FileTail, ServerConfig};
use logmeter_core::MetricStore;
use logmeter_runtime::{load_programs, Dispatcher};
use tokio::sync::mpsc;

/// Lines buffered between the tailer and the dispatcher.
const LINE_BUFFER: usize = 1024;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = ServerConfig::from_args()?;
    init_tracing(config.log_json)?;

    let store = Arc::new(MetricStore::new());
    let vms = load_programs(&config.progs, &store)?;
    if vms.is_empty() {
        tracing::warn!(progs = %config.progs.display(), "No programs loaded");
    }

    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    let dispatcher = tokio::spawn(Dispatcher::new(vms).run(rx));

    let tails = config.logs.iter().map(FileTail::at_end).collect();
    let tailer = tokio::spawn(tail_files(tails, config.poll_interval, tx));

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", config.addr, e)))?;
    tracing::info!(addr = %config.addr, logs = config.logs.len(), "Serving metrics");

    tokio::select! {
        result = axum::serve(listener, router(Arc::clone(&store))) => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tailer.abort();
    match dispatcher.await {
        Ok(lines) => tracing::info!(lines, "Dispatcher drained"),
        Err(e) => tracing::warn!(error = %e, "Dispatcher task failed"),
    }
    Ok(())
}
