//! Helper configuration, read once from the environment at startup

use slimdown_core::AppError;
use slimdown_ipc::ServerConfig;
use std::path::PathBuf;

pub const DEFAULT_SOCKET_PATH: &str = "/var/run/slimdown/helper.sock";
pub const DEFAULT_AUDIT_LOG_DIR: &str = "/var/log/slimdown";
pub const DEFAULT_STRIP_PATH: &str = "/usr/bin/strip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct HelperConfig {
    pub socket_path: PathBuf,
    pub allowed_uid: Option<u32>,
    pub audit_log_dir: PathBuf,
    pub strip_path: PathBuf,
    pub exit_after_job: bool,
    pub log_format: LogFormat,
}

impl HelperConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let allowed_uid = match lookup("SLIMDOWN_ALLOWED_UID") {
            Some(raw) => Some(raw.trim().parse::<u32>().map_err(|e| {
                AppError::Config(format!("SLIMDOWN_ALLOWED_UID={:?}: {}", raw, e))
            })?),
            None => None,
        };

        let exit_after_job = match lookup("SLIMDOWN_EXIT_AFTER_JOB").as_deref() {
            None => true,
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "SLIMDOWN_EXIT_AFTER_JOB={:?}: expected true or false",
                    other
                )))
            }
        };

        let log_format = match lookup("SLIMDOWN_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let path = |key: &str, default: &str| {
            let raw = lookup(key).unwrap_or_else(|| default.to_string());
            PathBuf::from(shellexpand::tilde(&raw).into_owned())
        };

        Ok(Self {
            socket_path: path("SLIMDOWN_SOCKET_PATH", DEFAULT_SOCKET_PATH),
            allowed_uid,
            audit_log_dir: path("SLIMDOWN_AUDIT_LOG_DIR", DEFAULT_AUDIT_LOG_DIR),
            strip_path: path("SLIMDOWN_STRIP_PATH", DEFAULT_STRIP_PATH),
            exit_after_job,
            log_format,
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            socket_path: self.socket_path.clone(),
            allowed_uid: self.allowed_uid,
            exit_after_job: self.exit_after_job,
        }
    }
}
