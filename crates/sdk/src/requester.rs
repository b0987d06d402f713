//! Requester - drives a session from connect to final result

use crate::client::{HelperClient, RunningJob};
use crate::error::{Result, SdkError};
use crate::installer::Installer;
use crate::session::{Effect, SessionEvent, SessionMachine, SessionState, DEFAULT_MAX_INSTALL_ATTEMPTS};
use crate::types::JobUpdate;
use slimdown_core::application::CancelToken;
use slimdown_core::domain::{JobResult, JobSpec};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs one job against the helper, provisioning it when needed.
///
/// The session logic lives in `SessionMachine`; this type only performs
/// the effects it asks for.
pub struct Requester {
    socket_path: PathBuf,
    installer: Arc<dyn Installer>,
    expected_version: String,
    expected_protocol: u32,
    max_install_attempts: u32,
}

impl Requester {
    pub fn new(socket_path: impl Into<PathBuf>, installer: Arc<dyn Installer>) -> Self {
        Self {
            socket_path: socket_path.into(),
            installer,
            expected_version: slimdown_core::VERSION.to_string(),
            expected_protocol: slimdown_ipc::PROTOCOL_VERSION,
            max_install_attempts: DEFAULT_MAX_INSTALL_ATTEMPTS,
        }
    }

    pub fn with_expected_version(mut self, version: impl Into<String>) -> Self {
        self.expected_version = version.into();
        self
    }

    pub fn with_max_install_attempts(mut self, attempts: u32) -> Self {
        self.max_install_attempts = attempts;
        self
    }

    /// Run `job` to its end, reporting every update to `on_update`.
    ///
    /// Returns the job result for completed, cancelled and interrupted jobs
    /// (the latter with status `error` and the bytes freed so far).
    ///
    /// # Errors
    /// - `SdkError::Connection` / `SdkError::VersionMismatch` if no usable
    ///   helper could be reached within the install budget
    /// - `SdkError::Helper` if the helper rejected the job or refused the
    ///   connection (busy, unauthorized)
    pub async fn run<F>(&self, job: &JobSpec, mut cancel: CancelToken, mut on_update: F) -> Result<JobResult>
    where
        F: FnMut(&JobUpdate),
    {
        let mut machine = SessionMachine::new(&self.expected_version, self.expected_protocol)
            .with_max_install_attempts(self.max_install_attempts);
        let mut effect = machine.start();
        let mut client: Option<HelperClient> = None;
        let mut running: Option<RunningJob> = None;
        let mut cancel_seen = false;

        loop {
            // Cancellation before a job exists ends the session without one
            if !cancel_seen
                && cancel.is_cancelled()
                && machine.state() != SessionState::Running
                && !machine.state().is_terminal()
            {
                cancel_seen = true;
                effect = machine.step(SessionEvent::CancelRequested)?;
            }

            debug!(state = ?machine.state(), effect = ?effect, "Session step");
            let event = match effect {
                Effect::Connect => match HelperClient::connect(&self.socket_path).await {
                    Ok(c) => {
                        client = Some(c);
                        SessionEvent::Connected
                    }
                    Err(e) => SessionEvent::ConnectFailed(e.to_string()),
                },
                Effect::QueryVersion => {
                    let c = client.as_mut().ok_or_else(|| missing("connection"))?;
                    match c.version().await {
                        Ok(v) => SessionEvent::VersionReported {
                            version: v.version,
                            protocol: v.protocol,
                        },
                        Err(SdkError::Helper { code, message }) => {
                            warn!(code, message = %message, "Helper refused the handshake");
                            client = None;
                            SessionEvent::HelperRefused { code, message }
                        }
                        Err(e) => {
                            warn!(error = %e, "Handshake failed");
                            client = None;
                            SessionEvent::ConnectionLost(None)
                        }
                    }
                }
                Effect::Reprovision => {
                    client = None;
                    info!(attempt = machine.install_attempts(), "Provisioning helper");
                    match self.installer.install().await {
                        Ok(()) => SessionEvent::InstallSucceeded,
                        Err(e) => SessionEvent::InstallFailed(e.to_string()),
                    }
                }
                Effect::SubmitJob => {
                    let c = client.take().ok_or_else(|| missing("connection"))?;
                    match c.submit(job).await {
                        Ok(r) => {
                            info!(job_id = %r.job_id, mode = %job.mode(), "Job submitted");
                            running = Some(r);
                            SessionEvent::JobSubmitted
                        }
                        Err(SdkError::Helper { code, message }) => {
                            SessionEvent::SubmitFailed { code, message }
                        }
                        Err(e) => {
                            warn!(error = %e, "Submit failed");
                            SessionEvent::ConnectionLost(None)
                        }
                    }
                }
                Effect::Await => {
                    let r = running.as_mut().ok_or_else(|| missing("job"))?;
                    tokio::select! {
                        update = r.next_update() => match update {
                            Some(JobUpdate::Finished(result)) => {
                                on_update(&JobUpdate::Finished(result.clone()));
                                SessionEvent::JobFinished(result)
                            }
                            Some(JobUpdate::ConnectionLost(partial)) => {
                                on_update(&JobUpdate::ConnectionLost(partial.clone()));
                                SessionEvent::ConnectionLost(Some(partial))
                            }
                            Some(update) => {
                                on_update(&update);
                                continue;
                            }
                            None => SessionEvent::ConnectionLost(None),
                        },
                        _ = cancel.cancelled(), if !cancel_seen => {
                            cancel_seen = true;
                            SessionEvent::CancelRequested
                        }
                    }
                }
                Effect::SendCancel => {
                    if let Some(r) = &running {
                        if let Err(e) = r.cancel().await {
                            warn!(error = %e, "Could not send cancel");
                        }
                    }
                    effect = Effect::Await;
                    continue;
                }
                Effect::TearDown => break,
            };
            effect = machine.step(event)?;
        }

        drop(running);
        debug!(state = ?machine.state(), "Session ended");
        machine.into_outcome()
    }
}

fn missing(what: &str) -> SdkError {
    SdkError::InvalidState(format!("no {} for this step", what))
}
