//! Logging setup: console output plus the audit trail
//!
//! Console verbosity follows `RUST_LOG` (default `slimdown=info`). Audit
//! records (target `slimdown::audit`) always go to a daily-rolling JSON file,
//! whatever the console filter says.

use crate::config::{HelperConfig, LogFormat};
use slimdown_core::AUDIT_TARGET;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "slimdown=info";
const AUDIT_FILE_PREFIX: &str = "audit.log";

/// Install the global subscriber. Keep the returned guard alive until exit
/// so buffered audit records are flushed.
pub fn init(config: &HelperConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    let console = match config.log_format {
        // Production: JSON structured logging
        LogFormat::Json => fmt::layer().json().with_filter(env_filter).boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_filter(env_filter).boxed(),
    };

    let (audit, guard) = match std::fs::create_dir_all(&config.audit_log_dir) {
        Ok(()) => {
            let appender =
                tracing_appender::rolling::daily(&config.audit_log_dir, AUDIT_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(Targets::new().with_target(AUDIT_TARGET, Level::INFO));
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!(
                "audit log disabled: cannot create {}: {}",
                config.audit_log_dir.display(),
                e
            );
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(console)
        .with(audit)
        .init();
    Ok(guard)
}
