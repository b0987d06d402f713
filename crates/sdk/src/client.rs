//! Helper Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{HelperVersion, JobUpdate};
use slimdown_core::application::runner::constants::EVENT_CHANNEL_CAPACITY;
use slimdown_core::domain::{JobId, JobResult, JobSpec};
use slimdown_ipc::codec::{read_frame, write_frame};
use slimdown_ipc::{Request, Response};
use std::path::Path;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Connection to the helper, before a job is submitted.
///
/// # Example
///
/// ```no_run
/// use slimdown_sdk::HelperClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut client = HelperClient::connect("/var/run/slimdown/helper.sock").await?;
/// let version = client.version().await?;
/// println!("helper {} (protocol {})", version.version, version.protocol);
/// # Ok(())
/// # }
/// ```
pub struct HelperClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl HelperClient {
    /// Connect to the helper socket
    pub async fn connect(socket_path: impl AsRef<Path>) -> Result<Self> {
        let path = socket_path.as_ref();
        let stream = UnixStream::connect(path).await.map_err(|e| {
            SdkError::Connection(format!("cannot connect to {}: {}", path.display(), e))
        })?;
        let (read_half, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer,
        })
    }

    /// Handshake: ask the helper for its version
    pub async fn version(&mut self) -> Result<HelperVersion> {
        write_frame(&mut self.writer, &Request::Version).await?;
        match self.next_response().await? {
            Response::Version { version, protocol } => Ok(HelperVersion { version, protocol }),
            other => Err(unexpected(other)),
        }
    }

    /// Submit the job. The connection becomes the job's event stream.
    ///
    /// # Errors
    /// - `SdkError::Helper` if the helper rejects the job (nothing was touched)
    pub async fn submit(mut self, job: &JobSpec) -> Result<RunningJob> {
        write_frame(&mut self.writer, &Request::Submit { job: job.clone() }).await?;
        let job_id = match self.next_response().await? {
            Response::Accepted { job_id } => job_id,
            other => return Err(unexpected(other)),
        };
        debug!(job_id = %job_id, "Job accepted by helper");

        let (tx, updates) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(pump(self.reader, tx));
        Ok(RunningJob {
            job_id,
            updates,
            writer: Arc::new(Mutex::new(self.writer)),
        })
    }

    async fn next_response(&mut self) -> Result<Response> {
        match read_frame::<_, Response>(&mut self.reader).await? {
            Some(Response::Error { code, message }) => Err(SdkError::Helper { code, message }),
            Some(response) => Ok(response),
            None => Err(SdkError::Connection(
                "helper closed the connection".to_string(),
            )),
        }
    }
}

/// A submitted job: updates arrive in production order, ending with
/// exactly one `Finished` or `ConnectionLost`.
pub struct RunningJob {
    pub job_id: JobId,
    updates: mpsc::Receiver<JobUpdate>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl RunningJob {
    /// Next update; `None` after the terminal update was delivered
    pub async fn next_update(&mut self) -> Option<JobUpdate> {
        self.updates.recv().await
    }

    /// Ask the helper to stop after the in-flight item
    pub async fn cancel(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, &Request::Cancel).await?;
        Ok(())
    }

    /// Drain all updates and return the final result
    pub async fn wait(mut self) -> JobResult {
        let mut last = None;
        while let Some(update) = self.next_update().await {
            match update {
                JobUpdate::Finished(result) | JobUpdate::ConnectionLost(result) => {
                    last = Some(result)
                }
                JobUpdate::Progress(_) | JobUpdate::ItemFailed(_) => {}
            }
        }
        last.unwrap_or_else(|| JobResult::failed(0, 0, 0))
    }
}

/// Forward frames as updates, synthesizing a terminal result if the helper
/// goes away before `finished`.
async fn pump(mut reader: BufReader<OwnedReadHalf>, tx: mpsc::Sender<JobUpdate>) {
    let mut partial = JobResult::failed(0, 0, 0);
    loop {
        let update = match read_frame::<_, Response>(&mut reader).await {
            Ok(Some(Response::Progress(p))) => {
                partial.total_bytes_freed += p.bytes_freed;
                partial.items_processed += 1;
                JobUpdate::Progress(p)
            }
            Ok(Some(Response::ItemFailed(f))) => {
                partial.items_failed += 1;
                JobUpdate::ItemFailed(f)
            }
            Ok(Some(Response::Finished(result))) => {
                let _ = tx.send(JobUpdate::Finished(result)).await;
                return;
            }
            Ok(Some(Response::Error { code, message })) => {
                // e.g. a late cancel racing the final result
                warn!(code, message = %message, "Helper reported an error mid-job");
                continue;
            }
            Ok(Some(other)) => {
                warn!(response = ?other, "Ignoring unexpected frame");
                continue;
            }
            Ok(None) | Err(_) => {
                warn!(
                    bytes = partial.total_bytes_freed,
                    "Lost connection to helper before the job finished"
                );
                let _ = tx.send(JobUpdate::ConnectionLost(partial)).await;
                return;
            }
        };
        if tx.send(update).await.is_err() {
            return;
        }
    }
}

fn unexpected(response: Response) -> SdkError {
    SdkError::UnexpectedResponse(format!("{:?}", response))
}
