//! Helper Server
//!
//! Unix-socket accept loop. One connection (and so one job) at a time;
//! each job runs on a blocking thread and streams events back in order.

use crate::auth::PeerPolicy;
use crate::codec::{read_frame, write_frame};
use crate::error::{code, IpcError};
use crate::handler::{Action, ConnectionHandler};
use crate::types::{Request, Response};
use slimdown_core::application::runner::constants::EVENT_CHANNEL_CAPACITY;
use slimdown_core::application::{cancel_channel, CancelSender, CancelToken, JobRunner};
use slimdown_core::domain::{JobEvent, JobResult, JobSpec};
use slimdown_core::port::IdProvider;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const SOCKET_MODE: u32 = 0o600;

/// Helper Server Configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub socket_path: PathBuf,
    /// Non-root uid allowed to connect (and owner of the socket file)
    pub allowed_uid: Option<u32>,
    /// Stop serving once the first job's connection closes
    pub exit_after_job: bool,
}

/// Helper Server
pub struct HelperServer {
    config: ServerConfig,
    runner: Arc<JobRunner>,
    ids: Arc<dyn IdProvider>,
}

/// A job running on the blocking pool
struct RunningJob {
    events: mpsc::Receiver<JobEvent>,
    handle: JoinHandle<slimdown_core::Result<JobResult>>,
    cancel: CancelSender,
    /// Partial totals, used if the job thread dies
    seen: JobResult,
}

impl HelperServer {
    pub fn new(config: ServerConfig, runner: Arc<JobRunner>, ids: Arc<dyn IdProvider>) -> Self {
        Self {
            config,
            runner,
            ids,
        }
    }

    /// Create the socket: stale socket removed, mode 0600, owned by the
    /// allowed user when one is configured.
    pub fn bind(&self) -> std::io::Result<UnixListener> {
        let path = &self.config.socket_path;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        remove_stale_socket(path)?;

        let listener = UnixListener::bind(path)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(SOCKET_MODE))?;
        if let Some(uid) = self.config.allowed_uid {
            std::os::unix::fs::chown(path, Some(uid), None)?;
        }

        info!(socket = %path.display(), "Helper listening");
        Ok(listener)
    }

    /// Serve until shutdown, or until the first job finishes when
    /// `exit_after_job` is set. Returns the result of the last job run.
    pub async fn serve(
        self,
        listener: UnixListener,
        mut shutdown: CancelToken,
    ) -> std::io::Result<Option<JobResult>> {
        let policy = PeerPolicy::new(self.config.allowed_uid);
        let slot = Arc::new(Semaphore::new(1));
        let (done_tx, mut done_rx) = mpsc::channel::<Option<JobResult>>(1);
        let mut last_result = None;

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, _) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "Accept failed");
                            continue;
                        }
                    };
                    self.admit(stream, &policy, &slot, &done_tx, &shutdown);
                }
                Some(result) = done_rx.recv() => {
                    if let Some(result) = result {
                        last_result = Some(result);
                        if self.config.exit_after_job {
                            info!("Job connection closed, helper exiting");
                            break;
                        }
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        // Let a cancelled job report before the socket disappears
        drop(done_tx);
        while let Some(result) = done_rx.recv().await {
            if result.is_some() {
                last_result = result;
            }
        }

        let _ = std::fs::remove_file(&self.config.socket_path);
        Ok(last_result)
    }

    fn admit(
        &self,
        stream: UnixStream,
        policy: &PeerPolicy,
        slot: &Arc<Semaphore>,
        done_tx: &mpsc::Sender<Option<JobResult>>,
        shutdown: &CancelToken,
    ) {
        let uid = match policy.authorize_stream(&stream) {
            Ok(uid) => uid,
            Err(e) => {
                warn!(error = %e, "Rejected peer");
                tokio::spawn(refuse(stream, code::UNAUTHORIZED, e.to_string()));
                return;
            }
        };

        let permit = match slot.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                debug!(uid, "Refusing concurrent connection");
                tokio::spawn(refuse(stream, code::BUSY, "helper is busy".to_string()));
                return;
            }
        };

        info!(uid, "Peer connected");
        let runner = Arc::clone(&self.runner);
        let ids = Arc::clone(&self.ids);
        let done_tx = done_tx.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = handle_connection(stream, uid, runner, ids, shutdown).await;
            drop(permit);
            let _ = done_tx.send(result).await;
        });
    }
}

fn remove_stale_socket(path: &Path) -> std::io::Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            // Only a socket nobody answers on is stale
            if std::os::unix::net::UnixStream::connect(path).is_ok() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::AddrInUse,
                    format!("{} is in use by a running helper", path.display()),
                ));
            }
            std::fs::remove_file(path)
        }
        Ok(_) => Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a socket", path.display()),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

async fn refuse(stream: UnixStream, code: i32, message: String) {
    let (_, mut writer) = stream.into_split();
    let _ = write_frame(&mut writer, &Response::error(code, message)).await;
}

/// Drive one connection. Returns the job result if a job ran.
async fn handle_connection(
    stream: UnixStream,
    peer_uid: u32,
    runner: Arc<JobRunner>,
    ids: Arc<dyn IdProvider>,
    mut shutdown: CancelToken,
) -> Option<JobResult> {
    let (read_half, mut writer) = stream.into_split();

    // Reading happens on its own task so select! below only waits on channels
    let (req_tx, mut requests) = mpsc::channel::<Result<Request, IpcError>>(8);
    let reader = tokio::spawn(async move {
        let mut reader = BufReader::new(read_half);
        loop {
            let frame = read_frame::<_, Request>(&mut reader).await;
            let stop = !matches!(frame, Ok(Some(_)) | Err(IpcError::Codec(_)));
            let sent = match frame {
                Ok(Some(req)) => req_tx.send(Ok(req)).await,
                Ok(None) => break,
                Err(e) => req_tx.send(Err(e)).await,
            };
            if sent.is_err() || stop {
                break;
            }
        }
    });

    let mut handler = ConnectionHandler::for_peer(peer_uid);
    let mut job: Option<RunningJob> = None;
    let mut peer_gone = false;
    let mut shutdown_seen = false;

    let result = loop {
        tokio::select! {
            request = requests.recv(), if !peer_gone => match request {
                Some(Ok(request)) => match handler.on_request(request) {
                    Action::Reply(response) => {
                        if write_frame(&mut writer, &response).await.is_err() {
                            peer_gone = true;
                        }
                    }
                    Action::Start(spec) => {
                        let job_id = ids.generate_id();
                        info!(job_id = %job_id, mode = %spec.mode(), "Job accepted");
                        job = Some(start_job(Arc::clone(&runner), *spec));
                        if write_frame(&mut writer, &Response::Accepted { job_id }).await.is_err() {
                            peer_gone = true;
                        }
                    }
                    Action::CancelJob => {
                        if let Some(job) = &job {
                            info!("Cancel requested by peer");
                            job.cancel.cancel();
                        }
                    }
                },
                Some(Err(e)) => {
                    warn!(error = %e, "Bad frame from peer");
                    let response = Response::error(code::VALIDATION_ERROR, e.to_string());
                    let _ = write_frame(&mut writer, &response).await;
                    if !matches!(e, IpcError::Codec(_)) {
                        peer_gone = true;
                    }
                }
                None => peer_gone = true,
            },
            event = next_event(&mut job) => match event {
                Some(event) => {
                    if let Some(job) = job.as_mut() {
                        record(&mut job.seen, &event);
                    }
                    if !peer_gone && write_frame(&mut writer, &to_response(event)).await.is_err() {
                        peer_gone = true;
                    }
                }
                None => {
                    let Some(finished) = job.take() else { continue };
                    let result = join_job(finished).await;
                    handler.on_job_finished();
                    if !peer_gone {
                        let _ = write_frame(&mut writer, &Response::Finished(result.clone())).await;
                    }
                    break Some(result);
                }
            },
            _ = shutdown.cancelled(), if !shutdown_seen => {
                shutdown_seen = true;
                if let Some(job) = &job {
                    job.cancel.cancel();
                } else {
                    break None;
                }
            }
        }

        if peer_gone {
            if handler.must_cancel_on_close() {
                if let Some(job) = &job {
                    if !job.cancel.is_cancelled() {
                        warn!("Peer disconnected mid-job, cancelling");
                        job.cancel.cancel();
                    }
                }
            } else {
                break None;
            }
        }
    };

    reader.abort();
    result
}

fn start_job(runner: Arc<JobRunner>, spec: JobSpec) -> RunningJob {
    let (event_tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (cancel, token) = cancel_channel();
    let handle = tokio::task::spawn_blocking(move || {
        let mut sink = event_tx;
        runner.run(&spec, &mut sink, &token)
    });
    RunningJob {
        events,
        handle,
        cancel,
        seen: JobResult::failed(0, 0, 0),
    }
}

/// Next event of the running job; pends forever when there is none
async fn next_event(job: &mut Option<RunningJob>) -> Option<JobEvent> {
    match job {
        Some(job) => job.events.recv().await,
        None => std::future::pending().await,
    }
}

async fn join_job(job: RunningJob) -> JobResult {
    match job.handle.await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!(error = %e, "Job failed to run");
            job.seen
        }
        Err(e) => {
            error!(error = %e, "Job thread panicked");
            job.seen
        }
    }
}

fn record(seen: &mut JobResult, event: &JobEvent) {
    match event {
        JobEvent::Progress(p) => {
            seen.total_bytes_freed += p.bytes_freed;
            seen.items_processed += 1;
        }
        JobEvent::ItemFailed(_) => seen.items_failed += 1,
    }
}

fn to_response(event: JobEvent) -> Response {
    match event {
        JobEvent::Progress(p) => Response::Progress(p),
        JobEvent::ItemFailed(f) => Response::ItemFailed(f),
    }
}
