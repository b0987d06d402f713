// Job Runner - drives one validated job from traversal to final result

mod cancel;
pub mod constants;

pub use cancel::{cancel_channel, CancelSender, CancelToken};

use crate::application::language_remover::LanguageRemover;
use crate::application::matcher::PathMatcher;
use crate::application::thinning::{ThinOptions, ThinOutcome, ThinningEngine};
use crate::application::traversal::{Candidate, CandidateKind, Traversal};
use crate::application::validation::validate_job;
use crate::domain::{ExitStatus, FailureKind, ItemFailure, JobResult, JobSpec, ProgressEvent};
use crate::error::{AppError, Result};
use crate::port::{BundleInspector, ProgressSink, SymbolStripper, Trash};
use crate::AUDIT_TARGET;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Executes jobs against the filesystem.
///
/// Synchronous by construction: the helper runs it on a blocking thread and
/// forwards events through the sink.
pub struct JobRunner {
    inspector: Arc<dyn BundleInspector>,
    languages: LanguageRemover,
    thinning: ThinningEngine,
}

/// Running totals for one job
#[derive(Debug, Default)]
struct Tally {
    bytes_freed: u64,
    processed: u64,
    failed: u64,
}

impl JobRunner {
    pub fn new(
        inspector: Arc<dyn BundleInspector>,
        trash: Arc<dyn Trash>,
        stripper: Arc<dyn SymbolStripper>,
    ) -> Self {
        Self {
            inspector,
            languages: LanguageRemover::new(trash),
            thinning: ThinningEngine::new(stripper),
        }
    }

    /// Run `spec` to completion, cancellation, or fatal error.
    ///
    /// Per-item failures are reported through `sink` and never stop the job.
    /// Cancellation is checked before each candidate; an in-flight item
    /// always finishes first.
    ///
    /// # Errors
    /// - `AppError::Validation` if the job is rejected (nothing was touched)
    pub fn run(
        &self,
        spec: &JobSpec,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<JobResult> {
        validate_job(spec)?;

        info!(
            mode = %spec.mode(),
            includes = spec.includes.len(),
            excludes = spec.excludes.len(),
            blocklist = spec.blocklist.len(),
            dry_run = spec.dry_run,
            "Job started"
        );

        let matcher = PathMatcher::new(spec);
        let candidates =
            Traversal::new(spec, &matcher, self.inspector.as_ref(), cancel).candidates();

        let mut tally = Tally::default();
        for item in candidates {
            if cancel.is_cancelled() {
                break;
            }

            let outcome = item.and_then(|candidate| self.process(&candidate, spec));
            match outcome {
                Ok(Some(event)) => {
                    tally.bytes_freed += event.bytes_freed;
                    tally.processed += 1;
                    sink.progress(event);
                }
                Ok(None) => {}
                Err(e) if e.is_per_item() => {
                    tally.failed += 1;
                    sink.item_failed(item_failure(e));
                }
                Err(e) => {
                    error!(error = %e, "Job aborted");
                    return Ok(JobResult::failed(
                        tally.bytes_freed,
                        tally.processed,
                        tally.failed,
                    ));
                }
            }
        }

        let status = if cancel.is_cancelled() {
            ExitStatus::Cancelled
        } else {
            ExitStatus::Success
        };
        let result = JobResult::new(status, tally.bytes_freed, tally.processed, tally.failed);

        info!(
            target: AUDIT_TARGET,
            status = %result.status,
            bytes = result.total_bytes_freed,
            processed = result.items_processed,
            failed = result.items_failed,
            "Job finished"
        );
        Ok(result)
    }

    /// Handle one candidate. `None` means the file was not applicable.
    fn process(&self, candidate: &Candidate, spec: &JobSpec) -> Result<Option<ProgressEvent>> {
        match candidate.kind {
            CandidateKind::LanguageFolder => {
                self.languages.remove(&candidate.path, spec).map(Some)
            }
            CandidateKind::Binary => {
                let empty = BTreeSet::new();
                let architectures = spec.architectures_to_remove().unwrap_or(&empty);
                let options = ThinOptions {
                    strip_symbols: spec.strip_symbols,
                    dry_run: spec.dry_run,
                };
                match self.thinning.thin(&candidate.path, architectures, options)? {
                    ThinOutcome::NotApplicable => Ok(None),
                    ThinOutcome::Thinned(event) => Ok(Some(event)),
                }
            }
        }
    }
}

/// Convert a per-item error into its streamed form, writing the audit record
fn item_failure(e: AppError) -> ItemFailure {
    let (path, kind, message) = match e {
        AppError::Filesystem { path, source } => {
            (path, FailureKind::Filesystem, source.to_string())
        }
        AppError::BinaryFormat { path, reason } => (path, FailureKind::BinaryFormat, reason),
        other => (PathBuf::new(), FailureKind::Filesystem, other.to_string()),
    };
    warn!(
        target: AUDIT_TARGET,
        path = %path.display(),
        kind = ?kind,
        message = %message,
        "Item failed"
    );
    ItemFailure {
        path,
        kind,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobEvent;
    use crate::port::bundle_inspector::mocks::StaticBundleInspector;
    use crate::port::symbol_stripper::mocks::{MockBehavior, MockStripper};
    use crate::port::trash::mocks::FailingTrash;
    use std::fs;
    use std::path::Path;

    fn runner() -> JobRunner {
        JobRunner::new(
            Arc::new(StaticBundleInspector::new()),
            Arc::new(FailingTrash),
            Arc::new(MockStripper::new(MockBehavior::Noop)),
        )
    }

    fn touch(path: &Path, bytes: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![b'x'; bytes]).unwrap();
    }

    /// Sink that requests cancellation after `limit` progress events
    struct CancelAfter {
        limit: usize,
        events: Vec<JobEvent>,
        sender: CancelSender,
    }

    impl ProgressSink for CancelAfter {
        fn progress(&mut self, event: ProgressEvent) {
            self.events.push(JobEvent::Progress(event));
            if self.events.len() == self.limit {
                self.sender.cancel();
            }
        }

        fn item_failed(&mut self, failure: ItemFailure) {
            self.events.push(JobEvent::ItemFailed(failure));
        }
    }

    #[test]
    fn test_languages_job_sums_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let res = dir.path().join("Foo.app/Contents/Resources");
        touch(&res.join("fr.lproj/a.strings"), 100);
        touch(&res.join("de.lproj/a.strings"), 30);
        touch(&res.join("en.lproj/a.strings"), 50);

        let spec = JobSpec::languages(vec![dir.path().to_path_buf()], ["fr.lproj", "de.lproj"]);
        let mut events = Vec::new();
        let result = runner()
            .run(&spec, &mut events, &CancelToken::never())
            .unwrap();

        assert_eq!(result.status, ExitStatus::Success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.total_bytes_freed, 130);
        assert_eq!(result.items_processed, 2);
        assert_eq!(events.len(), 2);
        assert!(res.join("en.lproj/a.strings").exists());
    }

    #[test]
    fn test_validation_failure_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("x.lproj/a"), 1);

        let spec = JobSpec::architectures(vec![dir.path().to_path_buf()], ["sparc"]);
        let mut events = Vec::new();
        let err = runner()
            .run(&spec, &mut events, &CancelToken::never())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(events.is_empty());
    }

    #[test]
    fn test_per_item_failure_does_not_fail_job() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("A.app/fr.lproj/a"), 10);
        touch(&dir.path().join("B.app/fr.lproj/a"), 10);

        // FailingTrash rejects every move
        let spec = JobSpec::languages(vec![dir.path().to_path_buf()], ["fr.lproj"]).with_trash(true);
        let mut events = Vec::new();
        let result = runner()
            .run(&spec, &mut events, &CancelToken::never())
            .unwrap();

        assert_eq!(result.status, ExitStatus::Success);
        assert_eq!(result.items_failed, 2);
        assert_eq!(result.total_bytes_freed, 0);
        assert!(events
            .iter()
            .all(|e| matches!(e, JobEvent::ItemFailed(f) if f.kind == FailureKind::Filesystem)));
    }

    #[test]
    fn test_cancel_after_three_items() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            touch(&dir.path().join(format!("App{:02}.app/fr.lproj/a", i)), 10 + i);
        }
        let spec = JobSpec::languages(vec![dir.path().to_path_buf()], ["fr.lproj"]);
        let (sender, token) = cancel_channel();
        let mut sink = CancelAfter {
            limit: 3,
            events: Vec::new(),
            sender,
        };

        let result = runner().run(&spec, &mut sink, &token).unwrap();

        assert_eq!(result.status, ExitStatus::Cancelled);
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.items_processed, 3);
        let summed: u64 = sink
            .events
            .iter()
            .map(|e| match e {
                JobEvent::Progress(p) => p.bytes_freed,
                JobEvent::ItemFailed(_) => 0,
            })
            .sum();
        assert_eq!(result.total_bytes_freed, summed);

        let remaining = (0..10)
            .filter(|i| dir.path().join(format!("App{:02}.app/fr.lproj", i)).exists())
            .count();
        assert_eq!(remaining, 7);
    }

    #[test]
    fn test_architectures_job_skips_non_fat_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Foo.app/Contents/MacOS/Foo"), 64);
        touch(&dir.path().join("Foo.app/Contents/Info.plist"), 16);

        let spec = JobSpec::architectures(vec![dir.path().to_path_buf()], ["i386"]);
        let mut events = Vec::new();
        let result = runner()
            .run(&spec, &mut events, &CancelToken::never())
            .unwrap();

        assert_eq!(result.status, ExitStatus::Success);
        assert_eq!(result.items_processed, 0);
        assert!(events.is_empty());
    }
}
