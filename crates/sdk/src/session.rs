//! Requester-side session state machine
//!
//! Pure transitions: the `Requester` performs each returned `Effect` and
//! feeds the outcome back as the next `SessionEvent`.
//!
//! ```text
//! Disconnected -> VersionChecking -> Ready -> Running -> Completed
//!      ^               |                         |    -> Cancelled
//!      |               v                         +--> -> Failed
//!      +---------- Installing
//! ```

use crate::error::SdkError;
use slimdown_core::domain::{ExitStatus, JobResult};

/// Install attempts before giving up on an unreachable or outdated helper
pub const DEFAULT_MAX_INSTALL_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    VersionChecking,
    Installing,
    Ready,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Cancelled | SessionState::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected,
    ConnectFailed(String),
    VersionReported { version: String, protocol: u32 },
    /// The helper answered the handshake with an error (busy, unauthorized)
    HelperRefused { code: i32, message: String },
    InstallSucceeded,
    InstallFailed(String),
    JobSubmitted,
    /// The helper refused the job (validation etc.)
    SubmitFailed { code: i32, message: String },
    CancelRequested,
    JobFinished(JobResult),
    /// Connection dropped; carries partial totals when a job was running
    ConnectionLost(Option<JobResult>),
}

/// Work the driver must do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Connect,
    QueryVersion,
    Reprovision,
    SubmitJob,
    SendCancel,
    /// Keep waiting for job updates
    Await,
    TearDown,
}

/// Why a session failed before producing a job result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Connection(String),
    VersionMismatch { expected: String, actual: String },
    Install(String),
    Rejected { code: i32, message: String },
}

impl From<Failure> for SdkError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Connection(msg) => SdkError::Connection(msg),
            Failure::VersionMismatch { expected, actual } => {
                SdkError::VersionMismatch { expected, actual }
            }
            Failure::Install(msg) => SdkError::Install(msg),
            Failure::Rejected { code, message } => SdkError::Helper { code, message },
        }
    }
}

#[derive(Debug)]
pub struct SessionMachine {
    state: SessionState,
    expected_version: String,
    expected_protocol: u32,
    install_attempts: u32,
    max_install_attempts: u32,
    cancel_requested: bool,
    result: Option<JobResult>,
    failure: Option<Failure>,
}

impl SessionMachine {
    pub fn new(expected_version: impl Into<String>, expected_protocol: u32) -> Self {
        Self {
            state: SessionState::Disconnected,
            expected_version: expected_version.into(),
            expected_protocol,
            install_attempts: 0,
            max_install_attempts: DEFAULT_MAX_INSTALL_ATTEMPTS,
            cancel_requested: false,
            result: None,
            failure: None,
        }
    }

    pub fn with_max_install_attempts(mut self, attempts: u32) -> Self {
        self.max_install_attempts = attempts;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn install_attempts(&self) -> u32 {
        self.install_attempts
    }

    /// First effect of a fresh session
    pub fn start(&self) -> Effect {
        Effect::Connect
    }

    /// Apply `event` and return the next effect.
    ///
    /// # Errors
    /// - `SdkError::InvalidState` if `event` cannot happen in the current state
    pub fn step(&mut self, event: SessionEvent) -> Result<Effect, SdkError> {
        use SessionEvent as E;
        use SessionState as S;

        let effect = match (self.state, event) {
            (S::Disconnected, E::Connected) => {
                self.state = S::VersionChecking;
                Effect::QueryVersion
            }
            (S::Disconnected, E::ConnectFailed(reason)) => {
                self.reprovision_or_fail(Failure::Connection(reason))
            }
            (S::VersionChecking, E::VersionReported { version, protocol }) => {
                if version == self.expected_version && protocol == self.expected_protocol {
                    self.state = S::Ready;
                    Effect::SubmitJob
                } else {
                    self.reprovision_or_fail(Failure::VersionMismatch {
                        expected: format!(
                            "{} (protocol {})",
                            self.expected_version, self.expected_protocol
                        ),
                        actual: format!("{} (protocol {})", version, protocol),
                    })
                }
            }
            // A running helper that says no is not fixed by reinstalling it
            (S::VersionChecking, E::HelperRefused { code, message }) => {
                self.fail(Failure::Rejected { code, message })
            }
            (S::VersionChecking, E::ConnectionLost(_)) => {
                self.reprovision_or_fail(Failure::Connection(
                    "helper closed the connection during the handshake".to_string(),
                ))
            }
            (S::Installing, E::InstallSucceeded) => {
                self.state = S::Disconnected;
                Effect::Connect
            }
            (S::Installing, E::InstallFailed(reason)) => self.fail(Failure::Install(reason)),
            (S::Ready, E::JobSubmitted) => {
                self.state = S::Running;
                Effect::Await
            }
            (S::Ready, E::SubmitFailed { code, message }) => {
                self.fail(Failure::Rejected { code, message })
            }
            (S::Ready, E::ConnectionLost(_)) => self.fail(Failure::Connection(
                "helper closed the connection before accepting the job".to_string(),
            )),
            (S::Running, E::CancelRequested) => {
                if self.cancel_requested {
                    Effect::Await
                } else {
                    self.cancel_requested = true;
                    Effect::SendCancel
                }
            }
            (S::Running, E::JobFinished(result)) => {
                self.state = match result.status {
                    ExitStatus::Success => S::Completed,
                    ExitStatus::Cancelled => S::Cancelled,
                    ExitStatus::Error => S::Failed,
                };
                self.result = Some(result);
                Effect::TearDown
            }
            (S::Running, E::ConnectionLost(partial)) => {
                self.state = S::Failed;
                self.result = Some(partial.unwrap_or_else(|| JobResult::failed(0, 0, 0)));
                Effect::TearDown
            }
            // Cancelling before the job exists ends the session untouched
            (S::Disconnected | S::VersionChecking | S::Installing | S::Ready, E::CancelRequested) => {
                self.state = S::Cancelled;
                self.result = Some(JobResult::new(ExitStatus::Cancelled, 0, 0, 0));
                Effect::TearDown
            }
            (state, event) => {
                return Err(SdkError::InvalidState(format!(
                    "{:?} in state {:?}",
                    event, state
                )))
            }
        };
        Ok(effect)
    }

    /// Final outcome once the session is terminal.
    ///
    /// A job that ran (even partially) yields its result; a session that
    /// failed before a job was accepted yields the failure.
    pub fn into_outcome(self) -> Result<JobResult, SdkError> {
        match (self.result, self.failure) {
            (Some(result), _) => Ok(result),
            (None, Some(failure)) => Err(failure.into()),
            (None, None) => Err(SdkError::InvalidState(format!(
                "session not finished ({:?})",
                self.state
            ))),
        }
    }

    fn reprovision_or_fail(&mut self, failure: Failure) -> Effect {
        if self.install_attempts < self.max_install_attempts {
            self.install_attempts += 1;
            self.state = SessionState::Installing;
            Effect::Reprovision
        } else {
            self.fail(failure)
        }
    }

    fn fail(&mut self, failure: Failure) -> Effect {
        self.state = SessionState::Failed;
        self.failure = Some(failure);
        Effect::TearDown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> SessionMachine {
        SessionMachine::new("1.0.0", 1)
    }

    fn version(v: &str, p: u32) -> SessionEvent {
        SessionEvent::VersionReported {
            version: v.to_string(),
            protocol: p,
        }
    }

    #[test]
    fn test_happy_path() {
        let mut m = machine();
        assert_eq!(m.start(), Effect::Connect);
        assert_eq!(m.step(SessionEvent::Connected).unwrap(), Effect::QueryVersion);
        assert_eq!(m.step(version("1.0.0", 1)).unwrap(), Effect::SubmitJob);
        assert_eq!(m.step(SessionEvent::JobSubmitted).unwrap(), Effect::Await);
        assert_eq!(m.state(), SessionState::Running);

        let result = JobResult::new(ExitStatus::Success, 100, 1, 0);
        assert_eq!(
            m.step(SessionEvent::JobFinished(result.clone())).unwrap(),
            Effect::TearDown
        );
        assert_eq!(m.state(), SessionState::Completed);
        assert_eq!(m.into_outcome().unwrap(), result);
    }

    #[test]
    fn test_unreachable_helper_is_installed_then_retried() {
        let mut m = machine();
        assert_eq!(
            m.step(SessionEvent::ConnectFailed("refused".into())).unwrap(),
            Effect::Reprovision
        );
        assert_eq!(m.state(), SessionState::Installing);
        assert_eq!(m.step(SessionEvent::InstallSucceeded).unwrap(), Effect::Connect);
        assert_eq!(m.state(), SessionState::Disconnected);
        assert_eq!(m.step(SessionEvent::Connected).unwrap(), Effect::QueryVersion);
    }

    #[test]
    fn test_version_mismatch_reprovisions_until_limit() {
        let mut m = machine().with_max_install_attempts(2);
        for _ in 0..2 {
            m.step(SessionEvent::Connected).unwrap();
            assert_eq!(m.step(version("0.9.0", 1)).unwrap(), Effect::Reprovision);
            m.step(SessionEvent::InstallSucceeded).unwrap();
        }
        m.step(SessionEvent::Connected).unwrap();
        assert_eq!(m.step(version("0.9.0", 1)).unwrap(), Effect::TearDown);
        assert_eq!(m.state(), SessionState::Failed);
        assert_eq!(m.install_attempts(), 2);
        assert!(matches!(
            m.into_outcome(),
            Err(SdkError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_protocol_mismatch_counts_as_version_mismatch() {
        let mut m = machine().with_max_install_attempts(0);
        m.step(SessionEvent::Connected).unwrap();
        assert_eq!(m.step(version("1.0.0", 2)).unwrap(), Effect::TearDown);
        assert!(matches!(
            m.into_outcome(),
            Err(SdkError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_busy_helper_fails_without_reprovision() {
        let mut m = machine();
        m.step(SessionEvent::Connected).unwrap();
        assert_eq!(
            m.step(SessionEvent::HelperRefused {
                code: 4003,
                message: "helper is busy".into(),
            })
            .unwrap(),
            Effect::TearDown
        );
        assert_eq!(m.state(), SessionState::Failed);
        assert_eq!(m.install_attempts(), 0);
        assert!(matches!(
            m.into_outcome(),
            Err(SdkError::Helper { code: 4003, .. })
        ));
    }

    #[test]
    fn test_install_failure_is_terminal() {
        let mut m = machine();
        m.step(SessionEvent::ConnectFailed("refused".into())).unwrap();
        assert_eq!(
            m.step(SessionEvent::InstallFailed("denied".into())).unwrap(),
            Effect::TearDown
        );
        assert!(matches!(m.into_outcome(), Err(SdkError::Install(_))));
    }

    #[test]
    fn test_cancel_while_running_sent_once() {
        let mut m = machine();
        m.step(SessionEvent::Connected).unwrap();
        m.step(version("1.0.0", 1)).unwrap();
        m.step(SessionEvent::JobSubmitted).unwrap();

        assert_eq!(m.step(SessionEvent::CancelRequested).unwrap(), Effect::SendCancel);
        assert_eq!(m.step(SessionEvent::CancelRequested).unwrap(), Effect::Await);

        let result = JobResult::new(ExitStatus::Cancelled, 30, 3, 0);
        m.step(SessionEvent::JobFinished(result)).unwrap();
        assert_eq!(m.state(), SessionState::Cancelled);
    }

    #[test]
    fn test_connection_loss_mid_job_keeps_partial_totals() {
        let mut m = machine();
        m.step(SessionEvent::Connected).unwrap();
        m.step(version("1.0.0", 1)).unwrap();
        m.step(SessionEvent::JobSubmitted).unwrap();

        let partial = JobResult::failed(42, 2, 0);
        m.step(SessionEvent::ConnectionLost(Some(partial))).unwrap();
        assert_eq!(m.state(), SessionState::Failed);

        let outcome = m.into_outcome().unwrap();
        assert_eq!(outcome.status, ExitStatus::Error);
        assert_eq!(outcome.total_bytes_freed, 42);
    }

    #[test]
    fn test_rejected_job_fails_session() {
        let mut m = machine();
        m.step(SessionEvent::Connected).unwrap();
        m.step(version("1.0.0", 1)).unwrap();
        m.step(SessionEvent::SubmitFailed {
            code: 4000,
            message: "no include roots".into(),
        })
        .unwrap();
        assert!(matches!(
            m.into_outcome(),
            Err(SdkError::Helper { code: 4000, .. })
        ));
    }

    #[test]
    fn test_invalid_transition() {
        let mut m = machine();
        assert!(matches!(
            m.step(SessionEvent::JobSubmitted),
            Err(SdkError::InvalidState(_))
        ));
    }
}
