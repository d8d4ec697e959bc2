//! Table formatting for validation reports

use colored::Colorize;
use tabled::{
    builder::Builder,
    settings::{Alignment, Modify, Style, object::Rows},
};

use super::runner::ValidationReport;

/// Formats a report as a table followed by a summary
pub fn format_report(report: &ValidationReport) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Check", "Status", "Duration", "Message"]);

    for (name, result) in &report.results {
        let duration = format!("{:.2?}", result.duration);
        builder.push_record([
            name.as_str(),
            &result.status.as_colored_str(),
            &duration,
            &result.message,
        ]);
    }

    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    let mut output = table.to_string();
    output.push('\n');
    output.push_str(&format_summary(report));
    output
}

fn format_summary(report: &ValidationReport) -> String {
    let mut summary = format!("\n{}\n", "Summary".bold().underline());
    summary.push_str(&format!("  Total checks: {}\n", report.total));
    summary.push_str(&format!("  {} Passed: {}\n", "✓".green(), report.passed));
    if report.warned > 0 {
        summary.push_str(&format!("  {} Warned: {}\n", "⚠".yellow(), report.warned));
    }
    if report.failed > 0 {
        summary.push_str(&format!("  {} Failed: {}\n", "✗".red(), report.failed));
    }

    summary.push('\n');
    let overall = match (report.is_valid(), report.has_warnings()) {
        (true, false) => "Setup: VALID".green().bold(),
        (true, true) => "Setup: VALID (with warnings)".yellow().bold(),
        (false, _) => "Setup: INVALID".red().bold(),
    };
    summary.push_str(&format!("  {overall}\n"));
    summary
}

/// Prints a report and any check details to stdout
pub fn print_report(report: &ValidationReport) {
    println!("{}", format_report(report));

    for (name, result) in &report.results {
        if let Some(details) = &result.details {
            println!("\n{} Details:", name.bold());
            println!("{details}");
        }
    }
}
