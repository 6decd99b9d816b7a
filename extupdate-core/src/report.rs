//! Human-readable rendering of scan, conversion and history results

use crate::convert::{ConversionReport, JobStatus};
use crate::history::{LoadStatus, SaveStatus};
use crate::output::{HistoryResult, ScanResult};
use comfy_table::{Cell, Color, ContentArrangement, Table};
use nu_ansi_term::Color as AnsiColor;
use std::fmt::Write;

fn paint(text: &str, color: AnsiColor, use_color: bool) -> String {
    if use_color {
        color.paint(text).to_string()
    } else {
        text.to_string()
    }
}

fn header_table(headers: &[&str], use_color: bool) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Disabled);
    if use_color {
        table.enforce_styling();
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    } else {
        table.set_header(headers.to_vec());
    }
    table
}

/// Format a byte count as B, KB or MB
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    match bytes {
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}

/// Table of candidate files found by a scan
pub fn render_scan(result: &ScanResult, use_color: bool) -> String {
    if result.files.is_empty() {
        return format!(
            "No {} files found in {}\n",
            result.source,
            result.folder.display()
        );
    }

    let mut table = header_table(&["File", "Size", "Modified"], use_color);
    for file in &result.files {
        let modified = file
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        table.add_row(vec![file.display_name(), format_size(file.size), modified]);
    }

    let mut output = format!("{table}\n");
    writeln!(
        output,
        "Found {} {} files ({}) in {}",
        result.files.len(),
        result.source,
        format_size(result.total_size()),
        result.folder.display()
    )
    .unwrap();
    output
}

/// Per-file listing and totals for a finished conversion
pub fn render_conversion(report: &ConversionReport, use_color: bool) -> String {
    if report.status == JobStatus::Empty {
        return format!(
            "No {} files found in {}\n",
            report.source,
            report.folder.display()
        );
    }

    let mut output = String::new();

    for renamed in &report.renamed {
        write!(
            output,
            "  {} {} {}",
            renamed.from,
            paint("→", AnsiColor::Green, use_color),
            renamed.to
        )
        .unwrap();
        if let Some(backup) = &renamed.backup {
            write!(output, " (backup: {backup})").unwrap();
        }
        output.push('\n');
    }

    for error in &report.errors {
        writeln!(
            output,
            "  {} {}: {}",
            paint("✗", AnsiColor::Red, use_color),
            error.name,
            error.message
        )
        .unwrap();
    }

    let tick = if report.errors.is_empty() {
        paint("✓", AnsiColor::Green, use_color)
    } else {
        paint("⚠️ ", AnsiColor::Yellow, use_color)
    };
    writeln!(
        output,
        "{tick} Converted {} of {} files from {} to {}",
        report.converted, report.attempted, report.source, report.target
    )
    .unwrap();

    if !report.errors.is_empty() {
        writeln!(output, "{} files failed", report.errors.len()).unwrap();
    }

    if let Some(SaveStatus::Failed(reason)) = &report.history {
        writeln!(
            output,
            "{} History not saved: {reason}",
            paint("⚠️ ", AnsiColor::Yellow, use_color)
        )
        .unwrap();
    }

    output
}

/// Table of history entries, newest first
pub fn render_history(result: &HistoryResult, use_color: bool) -> String {
    let mut output = String::new();

    match &result.load_status {
        LoadStatus::Corrupt(reason) | LoadStatus::Unreadable(reason) => {
            writeln!(
                output,
                "{} History file {} could not be read: {reason}",
                paint("⚠️ ", AnsiColor::Yellow, use_color),
                result.path.display()
            )
            .unwrap();
        },
        LoadStatus::Loaded(_) | LoadStatus::Missing => {},
    }

    if result.entries.is_empty() {
        output.push_str("No history entries found\n");
        return output;
    }

    let mut table = header_table(&["Date", "Change", "Old path", "New path"], use_color);
    for entry in &result.entries {
        let date = entry
            .timestamp
            .split('.')
            .next()
            .unwrap_or(&entry.timestamp)
            .replace('T', " ");
        table.add_row(vec![
            date,
            format!("{} → {}", entry.old_ext, entry.new_ext),
            entry.old_path.display().to_string(),
            entry.new_path.display().to_string(),
        ]);
    }

    writeln!(output, "{table}").unwrap();
    if result.entries.len() < result.total {
        writeln!(
            output,
            "Showing {} of {} entries",
            result.entries.len(),
            result.total
        )
        .unwrap();
    }

    output
}
