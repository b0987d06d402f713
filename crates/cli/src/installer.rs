//! SpawnHelper - launches the helper binary on demand

use async_trait::async_trait;
use slimdown_sdk::{HelperClient, Installer, SdkError};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, info};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
const READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Starts `slimdown-helper` and waits for its socket.
///
/// Elevation is the caller's business: run the CLI through `sudo`, or point
/// `--helper` at a wrapper that elevates.
pub struct SpawnHelper {
    program: PathBuf,
    socket_path: PathBuf,
    allowed_uid: Option<u32>,
}

impl SpawnHelper {
    pub fn new(program: PathBuf, socket_path: PathBuf, allowed_uid: Option<u32>) -> Self {
        Self {
            program,
            socket_path,
            allowed_uid,
        }
    }
}

#[async_trait]
impl Installer for SpawnHelper {
    async fn install(&self) -> slimdown_sdk::Result<()> {
        info!(program = %self.program.display(), "Launching helper");

        let mut command = tokio::process::Command::new(&self.program);
        command
            .env("SLIMDOWN_SOCKET_PATH", &self.socket_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        if let Some(uid) = self.allowed_uid {
            command.env("SLIMDOWN_ALLOWED_UID", uid.to_string());
        }

        let mut child = command.spawn().map_err(|e| {
            SdkError::Install(format!("cannot launch {}: {}", self.program.display(), e))
        })?;

        let deadline = tokio::time::Instant::now() + READY_TIMEOUT;
        loop {
            if let Some(status) = child.try_wait()? {
                return Err(SdkError::Install(format!(
                    "helper exited during startup ({})",
                    status
                )));
            }
            // Check readiness with a plain connect; the session reconnects for the handshake
            if HelperClient::connect(&self.socket_path).await.is_ok() {
                debug!(socket = %self.socket_path.display(), "Helper socket is ready");
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                let _ = child.start_kill();
                return Err(SdkError::Install(format!(
                    "helper did not open {} within {:?}",
                    self.socket_path.display(),
                    READY_TIMEOUT
                )));
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }

        // The helper outlives this call; it exits on its own after the job
        tokio::spawn(async move {
            let _ = child.wait().await;
        });
        Ok(())
    }
}
