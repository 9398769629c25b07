//! Rendering for the watch TUI.

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::api::ExecutionState;
use crate::tui::app::WatchApp;
use crate::tui::widgets::ResultTable;

/// Renders the watch screen.
pub fn render(frame: &mut Frame, app: &WatchApp) {
    let has_results = app
        .results
        .as_ref()
        .and_then(|r| r.result.as_ref())
        .is_some();

    let constraints = if has_results {
        vec![
            Constraint::Length(4),
            Constraint::Length(6),
            Constraint::Min(5),
            Constraint::Length(1),
        ]
    } else {
        vec![
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(1),
        ]
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_log(frame, app, chunks[1]);

    if has_results {
        render_results(frame, app, chunks[2]);
        render_footer(frame, app, chunks[3]);
    } else {
        render_footer(frame, app, chunks[2]);
    }
}

fn state_style(state: ExecutionState) -> Style {
    match state {
        ExecutionState::Completed => Style::default().fg(Color::Green),
        ExecutionState::Failed => Style::default().fg(Color::Red),
        ExecutionState::Cancelled | ExecutionState::Expired => Style::default().fg(Color::Yellow),
        ExecutionState::Pending | ExecutionState::Executing => Style::default().fg(Color::Cyan),
    }
}

fn render_header(frame: &mut Frame, app: &WatchApp, area: ratatui::layout::Rect) {
    let lines = vec![
        Line::from(vec![
            Span::styled("Execution ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(app.execution_id.clone()),
        ]),
        Line::from(Span::styled(app.status_line(), state_style(app.state))),
    ];

    let header = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" duneq watch "),
    );
    frame.render_widget(header, area);
}

fn render_log(frame: &mut Frame, app: &WatchApp, area: ratatui::layout::Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let start = app.log.len().saturating_sub(visible);

    let lines: Vec<Line> = app.log[start..]
        .iter()
        .map(|entry| Line::from(entry.clone()))
        .collect();

    let log = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" log "));
    frame.render_widget(log, area);
}

fn render_results(frame: &mut Frame, app: &WatchApp, area: ratatui::layout::Rect) {
    let block = Block::default().borders(Borders::ALL).title(" results ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(result) = app.results.as_ref().and_then(|r| r.result.as_ref()) {
        // Leave room for borders and the footer line
        let visible_rows = inner.height.saturating_sub(5) as usize;
        let table = ResultTable::new(result, app.max_display_rows.min(visible_rows.max(1)));
        frame.render_widget(table, inner);
    }
}

fn render_footer(frame: &mut Frame, app: &WatchApp, area: ratatui::layout::Rect) {
    let help = if app.is_settled() {
        "q quit"
    } else {
        "c cancel execution | q detach (execution keeps running)"
    };
    let footer = Paragraph::new(Line::from(Span::styled(
        help,
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(footer, area);
}
