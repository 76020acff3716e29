use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem},
};

use crate::app::{App, FormField, Panel};

use super::theme;

pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.active_panel == Panel::Form;
    let border_style = if focused {
        Style::default().fg(theme::BLUE)
    } else {
        Style::default().fg(theme::SURFACE2)
    };

    let block = Block::default()
        .title(format!(" Run Options — {} ", app.mode.label()))
        .borders(Borders::ALL)
        .border_style(border_style);

    let items: Vec<ListItem> = app
        .form_fields()
        .iter()
        .enumerate()
        .map(|(i, &field)| {
            let cursor_here = i == app.form_cursor && focused;
            let label_style = if cursor_here {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default().fg(theme::SUBTEXT0)
            };

            let (value, value_style) = if cursor_here && app.editing.is_some() {
                let buffer = app.editing.as_ref().map(|b| b.value()).unwrap_or_default();
                (format!("{buffer}│"), Style::default().fg(theme::YELLOW))
            } else {
                (field_value(app, field), Style::default().fg(theme::TEXT))
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!(" {:<18}", field.label()), label_style),
                Span::styled(value, value_style),
            ]))
        })
        .collect();

    let list = List::new(items).block(block);
    frame.render_widget(list, area);
}

fn field_value(app: &App, field: FormField) -> String {
    match field {
        FormField::Headless => checkbox(app.config.headless),
        FormField::Video => checkbox(app.config.video),
        FormField::Trace => checkbox(app.config.trace),
        FormField::InstallDeps => checkbox(app.config.install_deps),
        FormField::InstallBrowsers => checkbox(app.config.install_browsers),
        FormField::LogLevel => app.config.log_level.as_arg().to_string(),
        _ => app.text_value(field),
    }
}

fn checkbox(on: bool) -> String {
    if on { "[x]".to_string() } else { "[ ]".to_string() }
}
