use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use crate::app::{App, Panel};

use super::theme;

pub fn draw(frame: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.active_panel == Panel::Output;
    let border_style = if focused {
        Style::default().fg(theme::BLUE)
    } else {
        Style::default().fg(theme::SURFACE2)
    };

    let title = match app.elapsed_run_secs() {
        Some(secs) => format!(" Output — running {}s ", secs),
        None => " Output ".to_string(),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);
    let inner = block.inner(area);

    let lines: Vec<Line> = app
        .output_lines
        .iter()
        .map(|line| Line::from(Span::styled(line.as_str(), line_style(line))))
        .collect();

    // Unwrapped lines keep the scroll arithmetic exact.
    let total = lines.len() as u16;
    let max_scroll = total.saturating_sub(inner.height);
    if app.output_follow {
        app.output_scroll = max_scroll;
    } else {
        app.output_scroll = app.output_scroll.min(max_scroll);
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((app.output_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn line_style(line: &str) -> Style {
    if line.starts_with("$ ") || line.starts_with("[server] $ ") {
        Style::default().fg(theme::MAUVE)
    } else if line.starts_with("[error]") {
        Style::default().fg(theme::RED)
    } else if line.starts_with("[server]") {
        Style::default().fg(theme::TEAL)
    } else {
        Style::default().fg(theme::SUBTEXT0)
    }
}
