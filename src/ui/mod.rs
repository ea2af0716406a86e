//! Terminal output for the run coordinator.
//!
//! Logging goes to stderr through `tracing`; the banners and summaries here
//! go to stdout for the operator watching a run.

pub mod icons;

use console::style;

use crate::errors::SyncError;
use crate::reconcile::{Pass, PassReport, RunReport};
use icons::{CHECK, CROSS, SEARCH, SKIP, SPARKLE, WARN};

/// Operator-facing headline for a pass.
pub fn pass_title(pass: Pass) -> &'static str {
    match pass {
        Pass::PromoteToDev => "Checking RT for tickets that need Dev Tracks...",
        Pass::PromoteToCommunity => "Checking for Dev Tracks that need Community Bugs...",
        Pass::SyncCommunityStatus => "Updating Dev Tracks from Community Bugs...",
    }
}

pub fn pass_banner(pass: Pass) {
    println!();
    println!("{}{}", SEARCH, style(pass_title(pass)).cyan().bold());
}

pub fn pass_skipped(pass: Pass) {
    println!("  {}{}", SKIP, style(format!("{} skipped", pass)).dim());
}

/// One-line tally of a finished pass.
pub fn format_pass_summary(report: &PassReport) -> String {
    let mut parts = vec![format!("{} candidate(s)", report.candidates)];
    if report.created > 0 {
        parts.push(format!("{} created", report.created));
    }
    if report.updated > 0 {
        parts.push(format!("{} updated", report.updated));
    }
    if report.unchanged > 0 {
        parts.push(format!("{} unchanged", report.unchanged));
    }
    if report.skipped > 0 {
        parts.push(format!("{} skipped", report.skipped));
    }
    if !report.failures.is_empty() {
        parts.push(format!("{} failed", report.failures.len()));
    }
    format!("{}: {}", report.pass, parts.join(", "))
}

pub fn pass_summary(report: &PassReport) {
    let icon = if report.failures.is_empty() { CHECK } else { WARN };
    println!("  {}{}", icon, format_pass_summary(report));
    for failure in &report.failures {
        println!("    {} {}", style("-").dim(), style(failure).yellow());
    }
}

pub fn run_summary(report: &RunReport) {
    println!();
    let failures = report.failure_count();
    if failures == 0 {
        println!("{}{}", SPARKLE, style("Reconciliation complete").green().bold());
    } else {
        println!(
            "{}{}",
            WARN,
            style(format!("Reconciliation complete with {} record failure(s)", failures))
                .yellow()
                .bold()
        );
    }
}

pub fn fatal(err: &SyncError) {
    eprintln!();
    eprintln!("{}{} {}", CROSS, style("Run aborted:").red().bold(), err);
}
