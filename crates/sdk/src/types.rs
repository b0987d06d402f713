//! Requester-side types and job construction helpers

use crate::error::Result;
use slimdown_core::domain::{
    blocklist_for_mode, resolve_roots, BlocklistEntry, ItemFailure, JobResult, JobSpec, Mode,
    ProgressEvent, Root,
};
use std::path::Path;

/// Update streamed from a running job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobUpdate {
    Progress(ProgressEvent),
    ItemFailed(ItemFailure),
    /// The helper's final result
    Finished(JobResult),
    /// The connection dropped before `finished`: partial totals, status error
    ConnectionLost(JobResult),
}

/// The helper's handshake answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperVersion {
    pub version: String,
    pub protocol: u32,
}

/// Flags applied on top of roots and targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobOptions {
    pub trash: bool,
    pub strip_symbols: bool,
    pub dry_run: bool,
    pub uid: Option<u32>,
}

/// Resolve roots and the merged blocklist into a job for `mode`.
///
/// `targets` are language folder names or architecture identifiers.
pub fn build_job<I, S>(
    mode: Mode,
    targets: I,
    roots: &[Root],
    blocklist: &[BlocklistEntry],
    options: JobOptions,
) -> JobSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let (includes, excludes) = resolve_roots(roots, mode);
    let job = match mode {
        Mode::Languages => JobSpec::languages(includes, targets),
        Mode::Architectures => JobSpec::architectures(includes, targets),
    };
    job.with_excludes(excludes)
        .with_blocklist(blocklist_for_mode(blocklist, mode))
        .with_trash(options.trash)
        .with_strip_symbols(options.strip_symbols)
        .with_dry_run(options.dry_run)
        .with_uid(options.uid)
}

/// Parse a blocklist document (JSON array of entries)
pub fn parse_blocklist(json: &str) -> Result<Vec<BlocklistEntry>> {
    Ok(serde_json::from_str(json)?)
}

/// Load a blocklist file. It replaces any default list; entries are not merged.
pub fn load_blocklist(path: &Path) -> Result<Vec<BlocklistEntry>> {
    parse_blocklist(&std::fs::read_to_string(path)?)
}

/// Load a roots file (JSON array of roots)
pub fn load_roots(path: &Path) -> Result<Vec<Root>> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}
