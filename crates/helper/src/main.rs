//! Slimdown Helper - privileged worker
//! Serves one requester over a Unix socket and runs its removal job.

mod config;
mod logging;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use config::HelperConfig;
use slimdown_core::application::{cancel_channel, CancelSender, JobRunner};
use slimdown_core::port::id_provider::UuidProvider;
use slimdown_infra_fs::{PlistBundleInspector, StripTool, UserTrash};
use slimdown_ipc::HelperServer;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = HelperConfig::from_env()?;

    // 2. Initialize logging (console + audit file)
    let audit_guard = logging::init(&config)?;

    info!(
        version = VERSION,
        protocol = slimdown_ipc::PROTOCOL_VERSION,
        socket = %config.socket_path.display(),
        allowed_uid = ?config.allowed_uid,
        "Slimdown helper starting"
    );

    // 3. Setup dependencies (DI wiring)
    let runner = Arc::new(JobRunner::new(
        Arc::new(PlistBundleInspector::new()),
        Arc::new(UserTrash::new()),
        Arc::new(StripTool::new(&config.strip_path)),
    ));
    let server = HelperServer::new(config.server_config(), runner, Arc::new(UuidProvider));

    // 4. Bind the socket
    let listener = server
        .bind()
        .with_context(|| format!("cannot bind {}", config.socket_path.display()))?;

    // 5. Forward termination signals as shutdown (cancels a running job)
    let (shutdown_tx, shutdown) = cancel_channel();
    tokio::spawn(forward_signals(shutdown_tx));

    // 6. Serve until the job's connection closes
    let result = server.serve(listener, shutdown).await?;

    let exit_code = match &result {
        Some(result) => {
            info!(
                status = %result.status,
                bytes = result.total_bytes_freed,
                "Helper exiting after job"
            );
            result.exit_code
        }
        None => {
            info!("Helper exiting without a job");
            0
        }
    };

    // Flush the audit trail before exiting
    drop(audit_guard);
    std::process::exit(exit_code);
}

async fn forward_signals(shutdown: CancelSender) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "Cannot install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupt received"),
        _ = terminate.recv() => info!("Termination signal received"),
    }
    shutdown.cancel();
}
