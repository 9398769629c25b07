//! Result rendering and export.
//!
//! Turns a ResultsResponse into a box-drawn text table, a CSV document,
//! or pretty-printed JSON. Table rendering caps the displayed rows;
//! exports always contain every row.

use serde_json::Value;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use crate::api::{ExecutionResult, ResultsResponse};
use crate::error::{DuneqError, Result};

/// Maximum width for any table column.
const MAX_COLUMN_WIDTH: usize = 40;

/// Minimum width for any table column.
const MIN_COLUMN_WIDTH: usize = 4;

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Box-drawn table with a display row cap.
    #[default]
    Table,
    /// CSV with a header row; never truncated.
    Csv,
    /// JSON array of row objects; never truncated.
    Json,
}

/// Renders a cell value for table display.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders a cell value for CSV export. NULL becomes an empty field.
fn csv_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Quotes a CSV field when it contains a comma, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Serializes the full result set as CSV, header row first.
pub fn to_csv(result: &ExecutionResult) -> String {
    let columns = result.column_names();
    let mut out = String::new();

    let header: Vec<String> = columns.iter().map(|c| csv_escape(c)).collect();
    let _ = writeln!(out, "{}", header.join(","));

    for row in &result.rows {
        let fields: Vec<String> = columns
            .iter()
            .map(|column| csv_escape(&csv_value(row.get(column).unwrap_or(&Value::Null))))
            .collect();
        let _ = writeln!(out, "{}", fields.join(","));
    }

    out
}

/// Serializes the full result set as a pretty-printed JSON array.
pub fn to_json(result: &ExecutionResult) -> Result<String> {
    serde_json::to_string_pretty(&result.rows)
        .map_err(|e| DuneqError::internal(format!("Failed to serialize rows: {e}")))
}

/// Renders the result set as a box-drawn table.
///
/// Shows at most `max_rows` rows; a truncation notice points the user at
/// the CSV export for the full set.
pub fn format_table(result: &ExecutionResult, max_rows: usize) -> String {
    let columns = result.column_names();
    if columns.is_empty() {
        return "(empty result)\n".to_string();
    }

    let shown = result.rows.len().min(max_rows);
    let widths = column_widths(&columns, &result.rows[..shown]);

    let mut out = String::new();
    push_border(&mut out, &widths, '┌', '┬', '┐');
    push_row(
        &mut out,
        &widths,
        &columns.iter().map(String::as_str).collect::<Vec<_>>(),
    );
    push_border(&mut out, &widths, '├', '┼', '┤');

    for row in &result.rows[..shown] {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| display_value(row.get(column).unwrap_or(&Value::Null)))
            .collect();
        push_row(
            &mut out,
            &widths,
            &cells.iter().map(String::as_str).collect::<Vec<_>>(),
        );
    }

    push_border(&mut out, &widths, '└', '┴', '┘');

    let total = result
        .metadata
        .total_row_count
        .unwrap_or(result.rows.len() as u64);
    let _ = writeln!(
        out,
        "{} row{} returned",
        total,
        if total == 1 { "" } else { "s" }
    );
    if result.rows.len() > shown {
        let _ = writeln!(
            out,
            "Showing first {shown} of {} rows. Export CSV for the full set.",
            result.rows.len()
        );
    }

    out
}

/// Formats the execution metadata block shown alongside results.
pub fn format_metadata(results: &ResultsResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Execution ID: {}", results.execution_id);
    if let Some(query_id) = results.query_id {
        let _ = writeln!(out, "Query ID:     {query_id}");
    }
    let _ = writeln!(out, "State:        {}", results.state);
    if let Some(submitted) = results.times.submitted_at {
        let _ = writeln!(out, "Submitted:    {submitted}");
    }
    if let Some(started) = results.times.execution_started_at {
        let _ = writeln!(out, "Started:      {started}");
    }
    if let Some(ended) = results.times.execution_ended_at {
        let _ = writeln!(out, "Ended:        {ended}");
    }
    out
}

/// Renders the results in the requested format.
pub fn render(results: &ResultsResponse, format: OutputFormat, max_rows: usize) -> Result<String> {
    let empty = ExecutionResult::default();
    let result = results.result.as_ref().unwrap_or(&empty);

    match format {
        OutputFormat::Table => Ok(format_table(result, max_rows)),
        OutputFormat::Csv => Ok(to_csv(result)),
        OutputFormat::Json => to_json(result),
    }
}

/// Writes rendered output to a file, or stdout when no path is given.
pub fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, content).map_err(|e| {
            DuneqError::internal(format!("Failed to write {}: {e}", path.display()))
        }),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .map_err(|e| DuneqError::internal(format!("Failed to write output: {e}")))
        }
    }
}

fn column_widths(columns: &[String], rows: &[serde_json::Map<String, Value>]) -> Vec<usize> {
    let mut widths: Vec<usize> = columns
        .iter()
        .map(|c| c.chars().count().max(MIN_COLUMN_WIDTH))
        .collect();

    for row in rows {
        for (i, column) in columns.iter().enumerate() {
            let len = display_value(row.get(column).unwrap_or(&Value::Null))
                .chars()
                .count();
            widths[i] = widths[i].max(len);
        }
    }

    widths.iter().map(|&w| w.min(MAX_COLUMN_WIDTH)).collect()
}

/// Truncates a string to fit within the given width, adding an ellipsis.
fn truncate(s: &str, max_width: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        chars.into_iter().take(max_width).collect()
    } else {
        let head: String = chars.into_iter().take(max_width - 3).collect();
        format!("{head}...")
    }
}

fn push_border(out: &mut String, widths: &[usize], left: char, mid: char, right: char) {
    out.push(left);
    for (i, &width) in widths.iter().enumerate() {
        out.push_str(&"─".repeat(width + 2));
        if i < widths.len() - 1 {
            out.push(mid);
        }
    }
    out.push(right);
    out.push('\n');
}

fn push_row(out: &mut String, widths: &[usize], cells: &[&str]) {
    out.push('│');
    for (i, &width) in widths.iter().enumerate() {
        let cell = truncate(cells.get(i).copied().unwrap_or(""), width);
        let _ = write!(out, " {cell:<width$} │");
    }
    out.push('\n');
}
