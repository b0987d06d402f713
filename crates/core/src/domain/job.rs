// Job Domain Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Job ID (UUID v4, assigned by the helper on acceptance)
pub type JobId = String;

/// Removal mode of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Languages,
    Architectures,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Languages => write!(f, "languages"),
            Mode::Architectures => write!(f, "architectures"),
        }
    }
}

/// What a job removes. Serialized inline into the JobSpec as
/// `"mode": "languages", "languageFolders": [...]` or
/// `"mode": "architectures", "architecturesToRemove": [...]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum JobTarget {
    Languages {
        #[serde(rename = "languageFolders")]
        language_folders: BTreeSet<String>,
    },
    Architectures {
        #[serde(rename = "architecturesToRemove")]
        architectures_to_remove: BTreeSet<String>,
    },
}

impl JobTarget {
    pub fn mode(&self) -> Mode {
        match self {
            JobTarget::Languages { .. } => Mode::Languages,
            JobTarget::Architectures { .. } => Mode::Architectures,
        }
    }
}

/// Fully-resolved job description. Immutable once submitted.
///
/// `blocklist` holds only the bundle identifiers that apply to this job's
/// mode; the caller splits the merged blocklist before transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub includes: Vec<PathBuf>,
    #[serde(default)]
    pub excludes: Vec<PathBuf>,
    #[serde(default)]
    pub blocklist: BTreeSet<String>,
    #[serde(flatten)]
    pub target: JobTarget,
    #[serde(default, rename = "trash")]
    pub trash_instead_of_delete: bool,
    #[serde(default)]
    pub strip_symbols: bool,
    #[serde(default)]
    pub dry_run: bool,
    /// Requesting user; selects whose trash receives moved folders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
}

impl JobSpec {
    /// Create a language-removal job over `includes`
    pub fn languages<I, S>(includes: Vec<PathBuf>, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            includes,
            JobTarget::Languages {
                language_folders: folders.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// Create an architecture-thinning job over `includes`
    pub fn architectures<I, S>(includes: Vec<PathBuf>, architectures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            includes,
            JobTarget::Architectures {
                architectures_to_remove: architectures.into_iter().map(Into::into).collect(),
            },
        )
    }

    fn new(includes: Vec<PathBuf>, target: JobTarget) -> Self {
        Self {
            includes,
            excludes: Vec::new(),
            blocklist: BTreeSet::new(),
            target,
            trash_instead_of_delete: false,
            strip_symbols: false,
            dry_run: false,
            uid: None,
        }
    }

    pub fn with_excludes(mut self, excludes: Vec<PathBuf>) -> Self {
        self.excludes = excludes;
        self
    }

    pub fn with_blocklist<I, S>(mut self, bundle_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocklist = bundle_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_trash(mut self, trash: bool) -> Self {
        self.trash_instead_of_delete = trash;
        self
    }

    pub fn with_strip_symbols(mut self, strip: bool) -> Self {
        self.strip_symbols = strip;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_uid(mut self, uid: Option<u32>) -> Self {
        self.uid = uid;
        self
    }

    pub fn mode(&self) -> Mode {
        self.target.mode()
    }

    /// Language folder names targeted by this job (empty in architectures mode)
    pub fn language_folders(&self) -> Option<&BTreeSet<String>> {
        match &self.target {
            JobTarget::Languages { language_folders } => Some(language_folders),
            JobTarget::Architectures { .. } => None,
        }
    }

    /// Architecture identifiers targeted by this job (empty in languages mode)
    pub fn architectures_to_remove(&self) -> Option<&BTreeSet<String>> {
        match &self.target {
            JobTarget::Architectures {
                architectures_to_remove,
            } => Some(architectures_to_remove),
            JobTarget::Languages { .. } => None,
        }
    }
}

/// One removed (or thinned) item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub path: PathBuf,
    pub bytes_freed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_name: Option<String>,
}

impl ProgressEvent {
    pub fn new(path: impl Into<PathBuf>, bytes_freed: u64) -> Self {
        Self {
            path: path.into(),
            bytes_freed,
            bundle_name: None,
        }
    }

    pub fn with_bundle_name(mut self, bundle_name: Option<String>) -> Self {
        self.bundle_name = bundle_name;
        self
    }
}

/// Category of a per-item failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Filesystem,
    BinaryFormat,
}

/// A per-item error: recorded, streamed, never fatal to the job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

/// Event emitted by a running job, in production order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Progress(ProgressEvent),
    ItemFailed(ItemFailure),
}

/// Terminal status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitStatus {
    Success,
    Cancelled,
    Error,
}

impl ExitStatus {
    /// Process-style exit code: 0 on success, 1 otherwise.
    /// Cancellation and error share the code; `ExitStatus` tells them apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Cancelled | ExitStatus::Error => 1,
        }
    }
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitStatus::Success => write!(f, "SUCCESS"),
            ExitStatus::Cancelled => write!(f, "CANCELLED"),
            ExitStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Final result of a job, produced exactly once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub status: ExitStatus,
    pub exit_code: i32,
    pub total_bytes_freed: u64,
    #[serde(default)]
    pub items_processed: u64,
    #[serde(default)]
    pub items_failed: u64,
}

impl JobResult {
    pub fn new(
        status: ExitStatus,
        total_bytes_freed: u64,
        items_processed: u64,
        items_failed: u64,
    ) -> Self {
        Self {
            status,
            exit_code: status.exit_code(),
            total_bytes_freed,
            items_processed,
            items_failed,
        }
    }

    /// Result for a job that lost its connection or crashed mid-run
    pub fn failed(total_bytes_freed: u64, items_processed: u64, items_failed: u64) -> Self {
        Self::new(
            ExitStatus::Error,
            total_bytes_freed,
            items_processed,
            items_failed,
        )
    }
}
