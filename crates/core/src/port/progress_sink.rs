// Progress Sink Port
// One-directional event channel out of a running job

use crate::domain::{ItemFailure, JobEvent, ProgressEvent};
use tokio::sync::mpsc;

/// Receives job events in production order
pub trait ProgressSink: Send {
    fn progress(&mut self, event: ProgressEvent);

    fn item_failed(&mut self, failure: ItemFailure);
}

/// Bounded channel sink, used from the blocking job thread.
///
/// A dropped receiver (peer gone) is ignored here; the connection task
/// cancels the job in that case.
impl ProgressSink for mpsc::Sender<JobEvent> {
    fn progress(&mut self, event: ProgressEvent) {
        let _ = self.blocking_send(JobEvent::Progress(event));
    }

    fn item_failed(&mut self, failure: ItemFailure) {
        let _ = self.blocking_send(JobEvent::ItemFailed(failure));
    }
}

/// Collects events in memory
impl ProgressSink for Vec<JobEvent> {
    fn progress(&mut self, event: ProgressEvent) {
        self.push(JobEvent::Progress(event));
    }

    fn item_failed(&mut self, failure: ItemFailure) {
        self.push(JobEvent::ItemFailed(failure));
    }
}
