// JobSpec validation - runs before any filesystem mutation


use crate::application::runner::constants::MAX_ROOTS;
use crate::domain::{architecture_named, DomainError, JobSpec, JobTarget, KNOWN_ARCHITECTURES};
use crate::domain::language::known_folders;
use crate::error::{AppError, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Validate a job before it is allowed to run
///
/// # Errors
/// - `AppError::Validation` if the job would remove every known language or
///   architecture, names an unknown architecture, has no targets, no include
///   roots, or a relative path
pub fn validate_job(spec: &JobSpec) -> Result<()> {
    validate_paths(&spec.includes, "includes")?;
    validate_paths(&spec.excludes, "excludes")?;

    if spec.includes.is_empty() {
        return Err(AppError::Validation("no include roots".to_string()));
    }

    match &spec.target {
        JobTarget::Languages { language_folders } => validate_languages(language_folders),
        JobTarget::Architectures {
            architectures_to_remove,
        } => validate_architectures(architectures_to_remove),
    }
}

fn validate_paths(paths: &[PathBuf], field: &str) -> Result<()> {
    if paths.len() > MAX_ROOTS {
        return Err(AppError::Validation(format!(
            "{} has {} entries (max {})",
            field,
            paths.len(),
            MAX_ROOTS
        )));
    }
    for path in paths {
        if !path.is_absolute() {
            let err = DomainError::RelativePath(path.display().to_string());
            return Err(AppError::Validation(format!("{}: {}", field, err)));
        }
    }
    Ok(())
}

fn validate_languages(folders: &BTreeSet<String>) -> Result<()> {
    if folders.is_empty() {
        return Err(AppError::Validation(
            "no language folders selected".to_string(),
        ));
    }

    // Folder names are matched as single path components
    if let Some(bad) = folders
        .iter()
        .find(|f| f.is_empty() || f.contains('/') || *f == "." || *f == "..")
    {
        return Err(AppError::Validation(format!(
            "invalid language folder name: {:?}",
            bad
        )));
    }

    if known_folders().all(|known| folders.contains(known)) {
        return Err(AppError::Validation(
            "job would remove every language".to_string(),
        ));
    }
    Ok(())
}

fn validate_architectures(architectures: &BTreeSet<String>) -> Result<()> {
    if architectures.is_empty() {
        return Err(AppError::Validation(
            "no architectures selected".to_string(),
        ));
    }

    for name in architectures {
        if architecture_named(name).is_none() {
            let err = DomainError::UnknownArchitecture(name.clone());
            return Err(AppError::Validation(err.to_string()));
        }
    }

    if KNOWN_ARCHITECTURES
        .iter()
        .all(|arch| architectures.contains(arch.name))
    {
        return Err(AppError::Validation(
            "job would remove every architecture".to_string(),
        ));
    }
    Ok(())
}
