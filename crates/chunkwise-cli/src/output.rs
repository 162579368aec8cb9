//! Output formatting utilities.

use std::time::Duration;

use colored::Colorize;

use chunkwise_engine::{MatrixReport, RunSummary, TextReport};

/// Format a table.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let mut output = String::new();

    let header_line: String = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect::<Vec<_>>()
        .join(" │ ");
    output.push_str(&format!("{}\n", header_line.bright_cyan().bold()));

    let sep: String = widths
        .iter()
        .map(|w| "─".repeat(*w))
        .collect::<Vec<_>>()
        .join("─┼─");
    output.push_str(&format!("{}\n", sep));

    for row in rows {
        let row_line: String = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = width)
            })
            .collect::<Vec<_>>()
            .join(" │ ");
        output.push_str(&format!("{}\n", row_line));
    }

    output
}

/// Format a key-value list.
pub fn format_kv_list(items: &[(&str, String)]) -> String {
    let max_key_len = items.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

    items
        .iter()
        .map(|(k, v)| {
            format!(
                "  {}: {}",
                format!("{:width$}", k, width = max_key_len).bright_cyan(),
                v
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text report lines.
pub fn format_text_report(report: &TextReport) -> String {
    format!(
        "File name: {}\n\
         Total number of words = {}\n\
         N. of words beginning with a vowel = {}\n\
         N. of words ending with a consonant = {}",
        report.name, report.stats.words, report.stats.vowel_start, report.stats.consonant_end
    )
}

/// Matrix report lines, matrices numbered from 1.
pub fn format_matrix_report(report: &MatrixReport) -> String {
    let mut out = format!(
        "Matrix file: {}\n\
         Number of matrices = {}\n\
         Order of the matrices = {}",
        report.name,
        report.determinants.len(),
        report.order
    );
    for (i, det) in report.determinants.iter().enumerate() {
        out.push_str(&format!("\n\tMatrix {} Result: Determinant = {:.3e}", i + 1, det));
    }
    out
}

/// Print a text report.
pub fn print_text_report(report: &TextReport) {
    println!("\n{}", format_text_report(report));
}

/// Print a matrix report.
pub fn print_matrix_report(report: &MatrixReport) {
    println!("\n{}", format_matrix_report(report));
}

/// Print the elapsed time line.
pub fn print_elapsed(elapsed: Duration) {
    println!("\nElapsed time = {:.6} s", elapsed.as_secs_f64());
}

/// Print per-worker unit counts.
pub fn print_run_summary(summary: &RunSummary) {
    print_section("Workers");
    let rows: Vec<Vec<String>> = summary
        .workers
        .iter()
        .map(|w| vec![w.worker.to_string(), w.units.to_string()])
        .collect();
    print!("{}", format_table(&["Worker", "Units"], &rows));
    println!(
        "{}",
        format_kv_list(&[
            ("Inputs", summary.inputs.to_string()),
            ("Rounds", summary.rounds.to_string()),
            ("Units", summary.total_units().to_string()),
        ])
    );
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!("\n{}", title.bright_green().bold());
    println!("{}", "─".repeat(title.len()).bright_green());
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "✓".bright_green(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".bright_red(), message);
}
