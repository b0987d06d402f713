//! Connection Handler
//!
//! Worker-side protocol state for one connection, kept free of I/O so every
//! transition is testable: `AwaitingJob -> Running -> Finished`.

use crate::error::{code, to_error_response};
use crate::types::{Request, Response};
use slimdown_core::application::validate_job;
use slimdown_core::domain::JobSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingJob,
    Running,
    Finished,
}

/// What the server must do in response to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send this frame back
    Reply(Response),
    /// Start the (already validated) job, then send `accepted`
    Start(Box<JobSpec>),
    /// Signal the running job to stop
    CancelJob,
}

#[derive(Debug)]
pub struct ConnectionHandler {
    state: ConnectionState,
    /// Kernel-reported uid of the connected peer
    peer_uid: Option<u32>,
}

impl Default for ConnectionHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionHandler {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::AwaitingJob,
            peer_uid: None,
        }
    }

    /// Handler for an authenticated peer. A non-root peer may only act as
    /// itself: its jobs run with its own uid whatever the request says.
    pub fn for_peer(uid: u32) -> Self {
        Self {
            state: ConnectionState::AwaitingJob,
            peer_uid: Some(uid),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn on_request(&mut self, request: Request) -> Action {
        match (self.state, request) {
            (ConnectionState::AwaitingJob, Request::Version) => {
                Action::Reply(Response::current_version())
            }
            (ConnectionState::AwaitingJob, Request::Submit { job }) => {
                let job = match self.bind_uid(job) {
                    Ok(job) => job,
                    Err(reply) => return reply,
                };
                match validate_job(&job) {
                    Ok(()) => {
                        self.state = ConnectionState::Running;
                        Action::Start(Box::new(job))
                    }
                    // Rejected before start: the requester may submit again
                    Err(e) => Action::Reply(to_error_response(&e)),
                }
            }
            (ConnectionState::AwaitingJob, Request::Cancel) => Action::Reply(Response::error(
                code::INVALID_STATE,
                "no job is running",
            )),
            (_, Request::Submit { .. }) => Action::Reply(Response::error(
                code::ALREADY_SUBMITTED,
                "a job was already submitted on this connection",
            )),
            (ConnectionState::Running, Request::Cancel) => Action::CancelJob,
            (state, request) => Action::Reply(Response::error(
                code::INVALID_STATE,
                format!("{} not allowed while {:?}", request_name(&request), state),
            )),
        }
    }

    fn bind_uid(&self, mut job: JobSpec) -> Result<JobSpec, Action> {
        match self.peer_uid {
            None | Some(0) => Ok(job),
            Some(peer) => match job.uid {
                Some(claimed) if claimed != peer => Err(Action::Reply(Response::error(
                    code::UNAUTHORIZED,
                    format!("peer uid {} cannot submit a job for uid {}", peer, claimed),
                ))),
                _ => {
                    job.uid = Some(peer);
                    Ok(job)
                }
            },
        }
    }

    /// The job produced its final result
    pub fn on_job_finished(&mut self) {
        self.state = ConnectionState::Finished;
    }

    /// Whether losing the peer now requires cancelling a job
    pub fn must_cancel_on_close(&self) -> bool {
        self.state == ConnectionState::Running
    }
}

fn request_name(request: &Request) -> &'static str {
    match request {
        Request::Version => "version",
        Request::Submit { .. } => "submit",
        Request::Cancel => "cancel",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job() -> JobSpec {
        JobSpec::languages(vec![PathBuf::from("/Applications")], ["fr.lproj"])
    }

    fn error_code(action: Action) -> i32 {
        match action {
            Action::Reply(Response::Error { code, .. }) => code,
            other => panic!("expected error reply, got {:?}", other),
        }
    }

    #[test]
    fn test_handshake_then_submit() {
        let mut h = ConnectionHandler::new();
        assert!(matches!(
            h.on_request(Request::Version),
            Action::Reply(Response::Version { protocol: 1, .. })
        ));
        assert!(matches!(
            h.on_request(Request::Submit { job: job() }),
            Action::Start(_)
        ));
        assert_eq!(h.state(), ConnectionState::Running);
        assert!(h.must_cancel_on_close());
    }

    #[test]
    fn test_invalid_job_keeps_awaiting() {
        let mut h = ConnectionHandler::new();
        let bad = JobSpec::languages(vec![PathBuf::from("relative")], ["fr.lproj"]);
        assert_eq!(error_code(h.on_request(Request::Submit { job: bad })), 4000);
        assert_eq!(h.state(), ConnectionState::AwaitingJob);
    }

    #[test]
    fn test_peer_uid_is_stamped_on_job() {
        let mut h = ConnectionHandler::for_peer(501);
        let Action::Start(spec) = h.on_request(Request::Submit { job: job() }) else {
            panic!("expected start");
        };
        assert_eq!(spec.uid, Some(501));
    }

    #[test]
    fn test_foreign_uid_rejected() {
        let mut h = ConnectionHandler::for_peer(501);
        let other = job().with_uid(Some(502));
        assert_eq!(error_code(h.on_request(Request::Submit { job: other })), 4010);
        assert_eq!(h.state(), ConnectionState::AwaitingJob);

        let own = job().with_uid(Some(501));
        assert!(matches!(h.on_request(Request::Submit { job: own }), Action::Start(_)));
    }

    #[test]
    fn test_root_peer_may_name_any_uid() {
        let mut h = ConnectionHandler::for_peer(0);
        let Action::Start(spec) = h.on_request(Request::Submit {
            job: job().with_uid(Some(502)),
        }) else {
            panic!("expected start");
        };
        assert_eq!(spec.uid, Some(502));
    }

    #[test]
    fn test_second_submit_rejected() {
        let mut h = ConnectionHandler::new();
        h.on_request(Request::Submit { job: job() });
        assert_eq!(error_code(h.on_request(Request::Submit { job: job() })), 4004);
        assert_eq!(h.state(), ConnectionState::Running);

        h.on_job_finished();
        assert_eq!(error_code(h.on_request(Request::Submit { job: job() })), 4004);
    }

    #[test]
    fn test_cancel_only_while_running() {
        let mut h = ConnectionHandler::new();
        assert_eq!(error_code(h.on_request(Request::Cancel)), 4002);

        h.on_request(Request::Submit { job: job() });
        assert_eq!(h.on_request(Request::Cancel), Action::CancelJob);

        h.on_job_finished();
        assert_eq!(error_code(h.on_request(Request::Cancel)), 4002);
        assert!(!h.must_cancel_on_close());
    }

    #[test]
    fn test_version_rejected_after_submit() {
        let mut h = ConnectionHandler::new();
        h.on_request(Request::Submit { job: job() });
        assert_eq!(error_code(h.on_request(Request::Version)), 4002);
    }
}
