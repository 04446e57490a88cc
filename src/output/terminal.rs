//! Terminal summary of a sync run.

use crate::models::RunReport;
use colored::Colorize;
use itertools::Itertools;

/// Left-aligned label padded to `width`, so summary columns line up.
pub fn format_label<T: ToString>(value: T, width: usize) -> String {
    let value_str = value.to_string();
    format!("{value_str:<width$}")
}

/// Summary lines for `report`, without color codes in the names.
pub fn report_lines(report: &RunReport) -> Vec<String> {
    let groups = [
        ("created", &report.created),
        ("updated", &report.updated),
        ("unchanged", &report.unchanged),
        ("deleted", &report.deleted),
        ("excluded", &report.excluded),
    ];
    let mut lines: Vec<String> = groups
        .iter()
        .map(|(label, names)| {
            format!(
                "{}{:>4}  {}",
                format_label(label, 10),
                names.len(),
                names.iter().join(", ")
            )
        })
        .collect();
    lines.push(format!(
        "{}{:>4}  {}",
        format_label("skipped", 10),
        report.skipped.len(),
        report.skipped.iter().map(|s| s.line).join(", ")
    ));
    lines
}

/// Print the run summary to stdout.
pub fn print_report(report: &RunReport) {
    for skipped in &report.skipped {
        println!("{} {}", "WARNING".on_yellow(), skipped);
    }
    for line in report_lines(report) {
        println!("{line}");
    }
    let elapsed = report
        .elapsed()
        .map(|d| format!("{}ms", d.num_milliseconds()))
        .unwrap_or_default();
    let status = if report.is_noop() {
        "no changes".green()
    } else {
        format!("{} changes", report.write_count()).yellow()
    };
    let mode = report
        .mode
        .map(|m| format!(" ({m} mode)"))
        .unwrap_or_default();
    println!(
        "#Done {}{mode} started {} {elapsed}",
        status,
        report.started.format("%Y-%m-%d %H:%M:%S")
    );
}

/// Message shown when the change cache matched the input.
pub fn print_nothing_to_do() {
    println!("{}", "Input unchanged since last run, nothing to do.".green());
}
