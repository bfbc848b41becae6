//! CLI output formatting for run summaries and dry-run listings.

use std::path::Path;

use specfetch_core::orchestrator::{RunOutcome, RunPlan, RunReport};

/// Instruction shown whenever work was left behind.
pub const RESUME_HINT: &str = "Re-run the same command to resume.";

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    if width == 1 {
        return "…".to_string();
    }

    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}

/// Lines of the end-of-run summary.
pub(crate) fn summary_lines(report: &RunReport, state_file: &Path, width: usize) -> Vec<String> {
    let summary = &report.summary;
    let mut lines = vec![format!(
        "Found {} files: {} already downloaded, {} queued.",
        report.discovered, report.already_completed, report.queued
    )];
    lines.push(format!(
        "Downloaded {}, failed {}.",
        summary.succeeded, summary.failed
    ));

    if summary.interrupted {
        lines.push(format!(
            "Interrupted: {} file(s) not downloaded.",
            summary.abandoned
        ));
    }
    if summary.lost_workers > 0 {
        lines.push(format!(
            "{} download worker(s) stopped unexpectedly.",
            summary.lost_workers
        ));
    }
    for failure in &report.discovery_failures {
        lines.push(truncate_to_width(&format!("  listing skipped: {failure}"), width));
    }
    for collision in &report.collisions {
        lines.push(truncate_to_width(
            &format!(
                "  link skipped: {} would overwrite {}",
                collision.skipped.source_url(),
                collision.kept
            ),
            width,
        ));
    }
    for failed in &summary.failed_items {
        lines.push(truncate_to_width(
            &format!("  [{}] {}: {}", failed.kind, failed.item.source_url(), failed.message),
            width,
        ));
    }

    match report.outcome() {
        RunOutcome::Complete if report.ledger_cleared => {
            lines.push("All files downloaded. State file removed.".to_string());
        }
        RunOutcome::Complete if report.discovered == 0 => {
            lines.push("No matching files found.".to_string());
        }
        RunOutcome::Complete => lines.push("All files downloaded.".to_string()),
        RunOutcome::Partial => {
            lines.push(format!("Progress saved to {}.", state_file.display()));
            lines.push(RESUME_HINT.to_string());
        }
    }
    lines
}

/// Prints the end-of-run summary to stdout.
pub(crate) fn print_run_summary(report: &RunReport, state_file: &Path) {
    for line in summary_lines(report, state_file, terminal_width()) {
        println!("{line}");
    }
}

/// Prints the `--list` dry run: one pending URL per line, then counts.
pub(crate) fn print_plan(plan: &RunPlan) {
    for item in &plan.pending {
        println!("{}", item.source_url());
    }
    for failure in &plan.discovery_failures {
        eprintln!("listing skipped: {failure}");
    }
    for collision in &plan.collisions {
        eprintln!(
            "link skipped: {} would overwrite {}",
            collision.skipped.source_url(),
            collision.kept
        );
    }
    eprintln!(
        "{} files found, {} already downloaded, {} to download.",
        plan.discovered,
        plan.already_completed,
        plan.pending.len()
    );
}
