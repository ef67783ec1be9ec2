//! Display formatting for CLI output

use chartlift_kube::{Phase, ReconcileReport};
use chartlift_repo::ImportReport;
use console::style;

/// Print the end-of-import summary with every failed entry
pub fn print_import_report(report: &ImportReport) {
    println!();
    let summary = report.summary();
    if report.is_success() {
        println!("{} {}", style("✓").green().bold(), summary);
    } else {
        println!("{} {}", style("!").yellow().bold(), summary);
        for (chart, entry) in report.failures() {
            println!(
                "  {} {}:{} {}",
                style("✗").red(),
                style(chart).bold(),
                entry.version,
                style(entry.outcome.describe()).dim()
            );
        }
    }
}

/// Print per-phase counts of a publish run
pub fn print_reconcile_report(report: &ReconcileReport) {
    println!();
    for phase in Phase::ALL {
        println!(
            "  {} {} ({} updated)",
            style("✓").green(),
            phase,
            report.count(phase)
        );
    }
    println!("{} {}", style("✓").green().bold(), report.summary());
}
