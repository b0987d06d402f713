//! Slimdown CLI - unprivileged requester for the Slimdown helper

mod installer;
mod output;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use installer::SpawnHelper;
use slimdown_core::application::{cancel_channel, CancelToken};
use slimdown_core::domain::language::language_by_code;
use slimdown_core::domain::{architecture_named, BlocklistEntry, Mode, Root};
use slimdown_sdk::{
    build_job, load_blocklist, load_roots, parse_blocklist, HelperClient, JobOptions, JobUpdate,
    Requester,
};

const DEFAULT_SOCKET_PATH: &str = "/var/run/slimdown/helper.sock";
const DEFAULT_HELPER_PATH: &str = "/usr/local/libexec/slimdown-helper";
const DEFAULT_ROOT: &str = "/Applications";
const BUNDLED_BLOCKLIST: &str = include_str!("../blocklist.json");

#[derive(Parser)]
#[command(name = "slimdown")]
#[command(about = "Remove unused languages and architectures", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Helper socket path
    #[arg(long, global = true, env = "SLIMDOWN_SOCKET_PATH", default_value = DEFAULT_SOCKET_PATH)]
    socket: String,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show requester and helper versions
    Version,

    /// Remove language folders (ISO codes like `fr`, or folder names like `fr.lproj`)
    Languages {
        #[arg(required = true)]
        languages: Vec<String>,

        #[command(flatten)]
        job: JobArgs,
    },

    /// Remove architecture slices from universal binaries
    Architectures {
        #[arg(required = true)]
        architectures: Vec<String>,

        /// Strip debug symbols from thinned binaries
        #[arg(long)]
        strip: bool,

        #[command(flatten)]
        job: JobArgs,
    },

    /// List known languages and their folders
    ListLanguages,

    /// List known architectures
    ListArchitectures,
}

#[derive(Args)]
struct JobArgs {
    /// Include root (repeatable); ignored when --roots is given
    #[arg(long = "root")]
    roots: Vec<String>,

    /// Roots file (JSON list of roots with per-mode flags)
    #[arg(long = "roots", value_name = "FILE", conflicts_with = "roots")]
    roots_file: Option<String>,

    /// Blocklist file; replaces the bundled list
    #[arg(long, value_name = "FILE")]
    blocklist: Option<String>,

    /// Move to the trash instead of deleting
    #[arg(long)]
    trash: bool,

    /// Report what would be freed without modifying anything
    #[arg(long)]
    dry_run: bool,

    /// User whose trash receives removed items (defaults to the caller).
    /// The helper only honours a different uid when the caller is root.
    #[arg(long)]
    uid: Option<u32>,

    /// Helper executable launched when none is running
    #[arg(long, env = "SLIMDOWN_HELPER_PATH", default_value = DEFAULT_HELPER_PATH)]
    helper: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let socket = expand(&cli.socket);

    match cli.command {
        Commands::Version => {
            println!("  {} {}", "Requester:".bold(), slimdown_core::VERSION);
            match HelperClient::connect(&socket).await {
                Ok(mut client) => {
                    let version = client.version().await?;
                    println!(
                        "  {} {} (protocol {})",
                        "Helper:".bold(),
                        version.version,
                        version.protocol
                    );
                }
                Err(e) => {
                    println!("  {} {}", "Helper:".bold(), "NOT RUNNING".yellow());
                    tracing::debug!(error = %e, "Helper not reachable");
                }
            }
        }

        Commands::ListLanguages => println!("{}", output::languages_table()),

        Commands::ListArchitectures => println!("{}", output::architectures_table()),

        Commands::Languages { languages, job } => {
            let folders = language_folders(&languages)?;
            let code = run_job(socket, Mode::Languages, folders, false, job).await?;
            std::process::exit(code);
        }

        Commands::Architectures {
            architectures,
            strip,
            job,
        } => {
            for name in &architectures {
                if architecture_named(name).is_none() {
                    bail!("unknown architecture '{}' (see list-architectures)", name);
                }
            }
            let code = run_job(socket, Mode::Architectures, architectures, strip, job).await?;
            std::process::exit(code);
        }
    }

    Ok(())
}

async fn run_job(
    socket: PathBuf,
    mode: Mode,
    targets: Vec<String>,
    strip_symbols: bool,
    args: JobArgs,
) -> Result<i32> {
    let roots = match &args.roots_file {
        Some(file) => load_roots(&expand(file)).context("Invalid roots file")?,
        None if args.roots.is_empty() => vec![Root::new(DEFAULT_ROOT, true, true)],
        None => args
            .roots
            .iter()
            .map(|r| Root::new(expand(r), true, true))
            .collect(),
    };
    let blocklist: Vec<BlocklistEntry> = match &args.blocklist {
        Some(file) => load_blocklist(&expand(file)).context("Invalid blocklist file")?,
        None => parse_blocklist(BUNDLED_BLOCKLIST)?,
    };

    let uid = args.uid.or_else(current_uid);
    let job = build_job(
        mode,
        targets,
        &roots,
        &blocklist,
        JobOptions {
            trash: args.trash,
            strip_symbols,
            dry_run: args.dry_run,
            uid,
        },
    );

    let installer = Arc::new(SpawnHelper::new(expand(&args.helper), socket.clone(), uid));
    let requester = Requester::new(socket, installer);

    println!(
        "{}",
        format!("Removing {} from {} root(s)...", mode, job.includes.len())
            .cyan()
            .bold()
    );
    let result = requester
        .run(&job, interrupt_token(), |update| match update {
            JobUpdate::Progress(event) => output::print_progress(event),
            JobUpdate::ItemFailed(failure) => output::print_failure(failure),
            JobUpdate::ConnectionLost(_) => {
                eprintln!("{}", "✗ Lost connection to the helper".red())
            }
            JobUpdate::Finished(_) => {}
        })
        .await?;

    output::print_summary(&result, args.dry_run);
    Ok(result.exit_code)
}

/// Map language codes to all of their folder aliases; folder names pass through
fn language_folders(languages: &[String]) -> Result<Vec<String>> {
    let mut folders = Vec::new();
    for language in languages {
        if language.ends_with(".lproj") {
            folders.push(language.clone());
        } else if let Some(known) = language_by_code(language) {
            folders.extend(known.folders.iter().map(|f| f.to_string()));
        } else {
            bail!("unknown language '{}' (see list-languages)", language);
        }
    }
    Ok(folders)
}

/// Ctrl-C asks the helper to stop after the item in flight
fn interrupt_token() -> CancelToken {
    let (tx, token) = cancel_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Cancelling...".yellow());
            tx.cancel();
        }
    });
    token
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

#[cfg(unix)]
fn current_uid() -> Option<u32> {
    Some(nix::unistd::getuid().as_raw())
}

#[cfg(not(unix))]
fn current_uid() -> Option<u32> {
    None
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "slimdown=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes_expand_to_aliases() {
        let folders = language_folders(&["fr".to_string(), "Klingon.lproj".to_string()]).unwrap();
        assert!(folders.contains(&"fr.lproj".to_string()));
        assert!(folders.contains(&"French.lproj".to_string()));
        assert!(folders.contains(&"Klingon.lproj".to_string()));
    }

    #[test]
    fn test_unknown_language_code_is_rejected() {
        assert!(language_folders(&["xx".to_string()]).is_err());
    }

    #[test]
    fn test_bundled_blocklist_parses() {
        let entries = parse_blocklist(BUNDLED_BLOCKLIST).unwrap();
        assert!(!entries.is_empty());
    }

    #[test]
    fn test_cli_parses_job_flags() {
        let cli = Cli::try_parse_from([
            "slimdown",
            "architectures",
            "ppc",
            "i386",
            "--strip",
            "--dry-run",
            "--root",
            "/Applications",
        ])
        .unwrap();
        let Commands::Architectures {
            architectures,
            strip,
            job,
        } = cli.command
        else {
            panic!("expected architectures");
        };
        assert_eq!(architectures, vec!["ppc", "i386"]);
        assert!(strip);
        assert!(job.dry_run);
        assert_eq!(job.roots, vec!["/Applications"]);
    }
}
