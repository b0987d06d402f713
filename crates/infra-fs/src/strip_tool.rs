// Symbol stripper backed by the system `strip` tool
use slimdown_core::port::{StripError, SymbolStripper};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

pub const DEFAULT_STRIP_PATH: &str = "/usr/bin/strip";

/// Runs `strip -x <file>`: removes local symbols, keeps global ones
#[derive(Debug, Clone)]
pub struct StripTool {
    program: PathBuf,
}

impl StripTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for StripTool {
    fn default() -> Self {
        Self::new(DEFAULT_STRIP_PATH)
    }
}

impl SymbolStripper for StripTool {
    fn strip_local_symbols(&self, path: &Path) -> Result<(), StripError> {
        debug!(program = %self.program.display(), path = %path.display(), "Running strip");

        let output = Command::new(&self.program)
            .arg("-x")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;

        if output.status.success() {
            Ok(())
        } else {
            Err(StripError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
