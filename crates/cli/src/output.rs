//! Terminal output: tables and human-readable sizes

use colored::Colorize;
use slimdown_core::domain::{
    ExitStatus, FailureKind, ItemFailure, JobResult, ProgressEvent, KNOWN_ARCHITECTURES,
    KNOWN_LANGUAGES,
};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct LanguageRow {
    code: &'static str,
    name: &'static str,
    folders: String,
}

#[derive(Tabled)]
struct ArchitectureRow {
    name: &'static str,
    cputype: i32,
    cpusubtype: i32,
}

#[derive(Tabled)]
struct SummaryRow {
    status: String,
    freed: String,
    processed: u64,
    failed: u64,
}

pub fn languages_table() -> String {
    let rows = KNOWN_LANGUAGES.iter().map(|l| LanguageRow {
        code: l.code,
        name: l.name,
        folders: l.folders.join(", "),
    });
    Table::new(rows).to_string()
}

pub fn architectures_table() -> String {
    let rows = KNOWN_ARCHITECTURES.iter().map(|a| ArchitectureRow {
        name: a.name,
        cputype: a.cpu_type,
        cpusubtype: a.cpu_subtype,
    });
    Table::new(rows).to_string()
}

pub fn print_progress(event: &ProgressEvent) {
    let bundle = event
        .bundle_name
        .as_deref()
        .map(|b| format!(" [{}]", b))
        .unwrap_or_default();
    println!(
        "  {} {:>10}  {}{}",
        "✓".green(),
        format_bytes(event.bytes_freed),
        event.path.display(),
        bundle.dimmed()
    );
}

pub fn print_failure(failure: &ItemFailure) {
    let kind = match failure.kind {
        FailureKind::Filesystem => "filesystem",
        FailureKind::BinaryFormat => "binary format",
    };
    eprintln!(
        "  {} {} ({}): {}",
        "✗".red(),
        failure.path.display(),
        kind,
        failure.message
    );
}

pub fn print_summary(result: &JobResult, dry_run: bool) {
    println!();
    let headline = match (result.status, dry_run) {
        (ExitStatus::Success, true) => "✓ Dry run complete, nothing was modified".green().bold(),
        (ExitStatus::Success, false) => "✓ Done".green().bold(),
        (ExitStatus::Cancelled, _) => "○ Cancelled".yellow().bold(),
        (ExitStatus::Error, _) => "✗ Job did not complete".red().bold(),
    };
    println!("{}", headline);
    println!();

    let row = SummaryRow {
        status: result.status.to_string(),
        freed: format_bytes(result.total_bytes_freed),
        processed: result.items_processed,
        failed: result.items_failed,
    };
    println!("{}", Table::new(vec![row]));
}

/// Format a byte count with binary units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_tables_list_every_entry() {
        assert!(languages_table().contains("fr.lproj"));
        assert!(architectures_table().contains("arm64e"));
    }
}
