use ratatui::{prelude::*, widgets::Paragraph};

use super::theme;

use crate::app::App;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let bar = if app.scanning {
        let spinner = SPINNER_FRAMES[app.spinner_tick % SPINNER_FRAMES.len()];
        Line::from(vec![Span::styled(
            format!(" {} Scanning catalog...", spinner),
            Style::default().fg(theme::YELLOW),
        )])
    } else if app.filter_active {
        Line::from(vec![
            Span::styled(" [esc]", Style::default().fg(theme::YELLOW)),
            Span::raw(" clear  "),
            Span::styled("[enter]", Style::default().fg(theme::YELLOW)),
            Span::raw(" apply"),
        ])
    } else {
        let mut spans = vec![
            Span::styled(" [r]", Style::default().fg(theme::YELLOW)),
            Span::raw(" run  "),
            Span::styled("[x]", Style::default().fg(theme::YELLOW)),
            Span::raw(" stop  "),
            Span::styled("[s]", Style::default().fg(theme::YELLOW)),
            Span::raw(" serve  "),
            Span::styled("[m]", Style::default().fg(theme::YELLOW)),
            Span::raw(" mode  "),
            Span::styled("[y]", Style::default().fg(theme::YELLOW)),
            Span::raw(" copy  "),
            Span::styled("[e]", Style::default().fg(theme::YELLOW)),
            Span::raw(" edit  "),
            Span::styled("[/]", Style::default().fg(theme::YELLOW)),
            Span::raw(" filter  "),
            Span::styled("[q]", Style::default().fg(theme::YELLOW)),
            Span::raw(" quit"),
            Span::styled(
                format!("  [{}]", app.mode.label()),
                Style::default().fg(theme::TEAL),
            ),
        ];

        let server = app.server.status();
        spans.push(Span::styled(
            format!("  {} server", server.icon()),
            Style::default().fg(server.color()),
        ));

        let run = app.run.status();
        spans.push(Span::styled(
            format!("  {} run", run.icon()),
            Style::default().fg(run.color()),
        ));

        if run.is_active() {
            let spinner = SPINNER_FRAMES[app.spinner_tick % SPINNER_FRAMES.len()];
            let note = match app.elapsed_run_secs() {
                Some(secs) => format!(" {} {}s", spinner, secs),
                None => format!(" {}", spinner),
            };
            spans.push(Span::styled(note, Style::default().fg(theme::YELLOW)));
        }

        Line::from(spans)
    };

    let paragraph = Paragraph::new(bar).style(Style::default().bg(theme::SURFACE0));
    frame.render_widget(paragraph, area);
}
