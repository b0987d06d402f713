// Binary Thinning Engine - removes architecture slices from universal binaries

pub mod fat;

use crate::domain::architecture::{architecture_named, Architecture};
use crate::domain::{enclosing_bundle_name, ProgressEvent};
use crate::error::{AppError, Result};
use crate::port::SymbolStripper;
use crate::AUDIT_TARGET;
use fat::{FatError, FatHeader, FatSlice, Layout};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of offering a file to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThinOutcome {
    /// Not a universal binary: silently skipped
    NotApplicable,
    /// Processed (possibly freeing zero bytes)
    Thinned(ProgressEvent),
}

/// Options for one thinning operation
#[derive(Debug, Clone, Copy, Default)]
pub struct ThinOptions {
    pub strip_symbols: bool,
    pub dry_run: bool,
}

pub struct ThinningEngine {
    stripper: Arc<dyn SymbolStripper>,
}

impl ThinningEngine {
    pub fn new(stripper: Arc<dyn SymbolStripper>) -> Self {
        Self { stripper }
    }

    /// Thin `path` in place, dropping every slice named in `architectures`.
    ///
    /// The rewritten container goes to a temp file next to the original and
    /// replaces it with a single rename, so the original is never observed
    /// half-written. On any error the original is left byte-for-byte intact.
    ///
    /// # Errors
    /// - `AppError::BinaryFormat` if the header is malformed, every slice
    ///   would be removed, or stripping fails
    /// - `AppError::Filesystem` on I/O failure
    pub fn thin(
        &self,
        path: &Path,
        architectures: &BTreeSet<String>,
        options: ThinOptions,
    ) -> Result<ThinOutcome> {
        let file = File::open(path).map_err(|e| AppError::filesystem(path, e))?;
        let meta = file.metadata().map_err(|e| AppError::filesystem(path, e))?;
        if !meta.is_file() {
            return Ok(ThinOutcome::NotApplicable);
        }
        let original_len = meta.len();

        let header = match fat::read_header(&mut BufReader::new(&file), original_len) {
            Ok(Some(header)) => header,
            Ok(None) => return Ok(ThinOutcome::NotApplicable),
            Err(FatError::Malformed(reason)) => {
                return Err(AppError::BinaryFormat {
                    path: path.to_path_buf(),
                    reason,
                })
            }
            Err(FatError::Io(e)) => return Err(AppError::filesystem(path, e)),
        };

        let targets: Vec<&Architecture> = architectures
            .iter()
            .filter_map(|name| architecture_named(name))
            .collect();
        let (remove, keep): (Vec<FatSlice>, Vec<FatSlice>) = header
            .slices
            .iter()
            .partition(|s| targets.iter().any(|a| a.matches(s.cpu_type, s.cpu_subtype)));

        if keep.is_empty() {
            return Err(AppError::BinaryFormat {
                path: path.to_path_buf(),
                reason: "would remove all architectures".to_string(),
            });
        }

        if remove.is_empty() && !options.strip_symbols {
            debug!(path = %path.display(), "No matching slices");
            return Ok(ThinOutcome::Thinned(thinned_event(path, 0)));
        }

        let layout = if remove.is_empty() {
            None
        } else {
            Some(fat::plan_layout(header.is_64, &keep))
        };

        if options.dry_run {
            let new_len = layout.as_ref().map_or(original_len, |l| l.total_len);
            let freed = original_len.saturating_sub(new_len);
            info!(
                target: AUDIT_TARGET,
                path = %path.display(),
                bytes = freed,
                removed = remove.len(),
                "Would thin universal binary (dry run)"
            );
            return Ok(ThinOutcome::Thinned(thinned_event(path, freed)));
        }

        let new_len = self.rewrite(path, &file, &meta, &header, layout.as_ref(), options)?;
        let freed = original_len.saturating_sub(new_len);

        info!(
            target: AUDIT_TARGET,
            path = %path.display(),
            bytes = freed,
            removed = remove.len(),
            kept = keep.len(),
            stripped = options.strip_symbols,
            "Thinned universal binary"
        );
        Ok(ThinOutcome::Thinned(thinned_event(path, freed)))
    }

    /// Write the new container to a sibling temp file, optionally strip it,
    /// then rename it over `path`. Returns the final size.
    fn rewrite(
        &self,
        path: &Path,
        source: &File,
        meta: &std::fs::Metadata,
        header: &FatHeader,
        layout: Option<&Layout>,
        options: ThinOptions,
    ) -> Result<u64> {
        let fs_err = |e: io::Error| AppError::filesystem(path, e);
        let dir = path.parent().ok_or_else(|| {
            AppError::filesystem(path, io::Error::other("binary has no parent directory"))
        })?;

        let temp = tempfile::Builder::new()
            .prefix(".slimdown-thin-")
            .tempfile_in(dir)
            .map_err(fs_err)?;

        {
            let mut writer = BufWriter::new(temp.as_file());
            match layout {
                Some(layout) => write_container(source, layout, &mut writer).map_err(fs_err)?,
                None => {
                    // Strip only: start from an exact copy
                    let mut reader = source;
                    reader.seek(SeekFrom::Start(0)).map_err(fs_err)?;
                    io::copy(&mut reader, &mut writer).map_err(fs_err)?;
                }
            }
            writer.flush().map_err(fs_err)?;
        }
        temp.as_file().sync_all().map_err(fs_err)?;
        debug!(
            path = %path.display(),
            temp = %temp.path().display(),
            slices = header.slices.len(),
            "Wrote thinned container"
        );

        if options.strip_symbols {
            self.stripper
                .strip_local_symbols(temp.path())
                .map_err(|e| AppError::BinaryFormat {
                    path: path.to_path_buf(),
                    reason: format!("strip failed: {}", e),
                })?;
        }

        // The strip tool may have replaced the temp file; restore owner then
        // mode by path, since chown clears setuid/setgid
        std::os::unix::fs::chown(temp.path(), Some(meta.uid()), Some(meta.gid())).map_err(fs_err)?;
        std::fs::set_permissions(temp.path(), meta.permissions()).map_err(fs_err)?;
        let new_len = std::fs::metadata(temp.path()).map_err(fs_err)?.len();

        temp.persist(path).map_err(|e| fs_err(e.error))?;
        Ok(new_len)
    }
}

fn thinned_event(path: &Path, bytes_freed: u64) -> ProgressEvent {
    ProgressEvent::new(path, bytes_freed).with_bundle_name(enclosing_bundle_name(path))
}

/// Stream header, padding and kept slices into `writer`
fn write_container<W: Write>(source: &File, layout: &Layout, writer: &mut W) -> io::Result<()> {
    fat::write_header(writer, layout)?;
    let mut position = fat::FatHeader::header_len(layout.is_64, layout.placements.len());

    let mut reader = source;
    for (slice, offset) in &layout.placements {
        io::copy(&mut io::repeat(0).take(offset - position), writer)?;
        reader.seek(SeekFrom::Start(slice.offset))?;
        let copied = io::copy(&mut (&mut reader).take(slice.size), writer)?;
        if copied != slice.size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "slice shorter than header claims",
            ));
        }
        position = offset + slice.size;
    }
    Ok(())
}
