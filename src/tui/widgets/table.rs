//! Result table widget for the watch TUI.
//!
//! Renders a completed execution's rows as a formatted table with column
//! headers, auto-sized columns, and styled NULL values.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};
use serde_json::Value;

use crate::api::ExecutionResult;
use crate::output::display_value;

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 40;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 4;

/// Widget for rendering an execution result as a table.
pub struct ResultTable<'a> {
    result: &'a ExecutionResult,
    max_rows: usize,
}

impl<'a> ResultTable<'a> {
    /// Creates a new result table widget.
    pub fn new(result: &'a ExecutionResult, max_rows: usize) -> Self {
        Self { result, max_rows }
    }

    /// Calculates the optimal width for each column.
    fn calculate_column_widths(&self, columns: &[String]) -> Vec<usize> {
        let mut widths: Vec<usize> = columns
            .iter()
            .map(|col| col.chars().count().max(MIN_COLUMN_WIDTH))
            .collect();

        for row in self.result.rows.iter().take(self.max_rows) {
            for (i, column) in columns.iter().enumerate() {
                let len = display_value(row.get(column).unwrap_or(&Value::Null))
                    .chars()
                    .count();
                widths[i] = widths[i].max(len);
            }
        }

        widths.iter().map(|&w| w.min(MAX_COLUMN_WIDTH)).collect()
    }

    /// Truncates a string to fit within the given width, adding ellipsis if needed.
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

    /// Renders the table to a vector of Lines for embedding in other widgets.
    pub fn render_to_lines(&self, available_width: usize) -> Vec<Line<'a>> {
        let mut lines = Vec::new();

        let columns = self.result.column_names();
        if columns.is_empty() {
            lines.push(Line::from(Span::styled(
                "(empty result)",
                Style::default().fg(Color::DarkGray),
            )));
            return lines;
        }

        let widths = self.calculate_column_widths(&columns);

        // Scale down when the table would overflow the area
        let total_width: usize = widths.iter().sum::<usize>() + widths.len() * 3 + 1;
        let scale_factor = if total_width > available_width && available_width > 0 {
            available_width as f64 / total_width as f64
        } else {
            1.0
        };

        let adjusted_widths: Vec<usize> = widths
            .iter()
            .map(|&w| ((w as f64 * scale_factor) as usize).max(MIN_COLUMN_WIDTH))
            .collect();

        lines.push(self.render_border(&adjusted_widths, '┌', '┬', '┐'));
        lines.push(self.render_header_row(&columns, &adjusted_widths));
        lines.push(self.render_border(&adjusted_widths, '├', '┼', '┤'));

        for row in self.result.rows.iter().take(self.max_rows) {
            lines.push(self.render_data_row(row, &columns, &adjusted_widths));
        }

        lines.push(self.render_border(&adjusted_widths, '└', '┴', '┘'));

        let total = self
            .result
            .metadata
            .total_row_count
            .unwrap_or(self.result.rows.len() as u64);
        let shown = self.result.rows.len().min(self.max_rows);
        let footer = if (shown as u64) < total {
            format!("showing {shown} of {total} rows")
        } else {
            format!("{total} row{} returned", if total == 1 { "" } else { "s" })
        };
        lines.push(Line::from(Span::styled(
            footer,
            Style::default().fg(Color::DarkGray),
        )));

        lines
    }

    /// Renders a horizontal border line.
    fn render_border(&self, widths: &[usize], left: char, mid: char, right: char) -> Line<'a> {
        let mut border = String::new();
        border.push(left);

        for (i, &width) in widths.iter().enumerate() {
            border.push_str(&"─".repeat(width + 2));
            if i < widths.len() - 1 {
                border.push(mid);
            }
        }

        border.push(right);

        Line::from(Span::styled(border, Style::default().fg(Color::DarkGray)))
    }

    /// Renders the header row with column names.
    fn render_header_row(&self, columns: &[String], widths: &[usize]) -> Line<'a> {
        let mut spans = Vec::new();
        spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));

        for (i, column) in columns.iter().enumerate() {
            let width = widths.get(i).copied().unwrap_or(MIN_COLUMN_WIDTH);
            let name = Self::truncate(column, width);
            let padded = format!(" {name:<width$} ");

            spans.push(Span::styled(
                padded,
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
        }

        Line::from(spans)
    }

    /// Renders a data row.
    fn render_data_row(
        &self,
        row: &serde_json::Map<String, Value>,
        columns: &[String],
        widths: &[usize],
    ) -> Line<'a> {
        let mut spans = Vec::new();
        spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));

        for (i, column) in columns.iter().enumerate() {
            let width = widths.get(i).copied().unwrap_or(MIN_COLUMN_WIDTH);
            let value = row.get(column).unwrap_or(&Value::Null);
            let truncated = Self::truncate(&display_value(value), width);
            let padded = format!(" {truncated:<width$} ");

            let style = if value.is_null() {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC)
            } else {
                Style::default()
            };

            spans.push(Span::styled(padded, style));
            spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
        }

        Line::from(spans)
    }
}

impl Widget for ResultTable<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = self.render_to_lines(area.width as usize);

        for (i, line) in lines.iter().enumerate() {
            if i >= area.height as usize {
                break;
            }
            let y = area.y + i as u16;
            buf.set_line(area.x, y, line, area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ResultMetadata;
    use serde_json::json;

    fn sample_result() -> ExecutionResult {
        let rows = match json!([
            {"blockchain": "ethereum", "trade_count": 1042, "note": null},
            {"blockchain": "base", "trade_count": 77, "note": "l2"}
        ]) {
            Value::Array(rows) => rows
                .into_iter()
                .map(|r| match r {
                    Value::Object(map) => map,
                    _ => unreachable!(),
                })
                .collect(),
            _ => unreachable!(),
        };

        ExecutionResult {
            rows,
            metadata: ResultMetadata {
                column_names: vec![
                    "blockchain".to_string(),
                    "trade_count".to_string(),
                    "note".to_string(),
                ],
                total_row_count: Some(2),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_calculate_column_widths() {
        let result = sample_result();
        let table = ResultTable::new(&result, 1000);
        let columns = result.column_names();
        let widths = table.calculate_column_widths(&columns);

        assert_eq!(widths.len(), 3);
        // "blockchain" (10) beats "ethereum" (8)
        assert_eq!(widths[0], 10);
        // "trade_count" (11) beats "1042"
        assert_eq!(widths[1], 11);
        // "NULL" and "note" tie at MIN_COLUMN_WIDTH
        assert_eq!(widths[2], 4);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(ResultTable::truncate("hello", 10), "hello");
        assert_eq!(ResultTable::truncate("hello world", 8), "hello...");
        assert_eq!(ResultTable::truncate("hi", 2), "hi");
        assert_eq!(ResultTable::truncate("hello", 3), "hel");
    }

    #[test]
    fn test_render_to_lines() {
        let result = sample_result();
        let table = ResultTable::new(&result, 1000);
        let lines = table.render_to_lines(120);

        // Top border, header, separator, 2 data rows, bottom border, footer.
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_render_respects_row_cap() {
        let result = sample_result();
        let table = ResultTable::new(&result, 1);
        let lines = table.render_to_lines(120);

        // One data row instead of two, plus the truncation footer.
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_empty_result() {
        let result = ExecutionResult::default();
        let table = ResultTable::new(&result, 1000);
        let lines = table.render_to_lines(80);

        assert_eq!(lines.len(), 1);
    }
}
