use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem},
};

use crate::{
    app::{App, Panel},
    models::NodeKind,
};

use super::theme;

pub fn draw(frame: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.active_panel == Panel::Catalog;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let (suites, tests) = app.catalog.totals();
    let title = if app.catalog.is_empty() {
        " Catalog ".to_string()
    } else {
        format!(" Catalog — {} suites / {} tests ", suites, tests)
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    // Viewport height feeds the scroll math on the next keypress.
    let inner_height = block.inner(area).height as usize;
    app.catalog_viewport = inner_height;

    let visible = app.visible_catalog_nodes();

    if visible.is_empty() {
        let message = if app.scanning {
            "Scanning...".to_string()
        } else if !app.filter.value().is_empty() {
            "No matches.".to_string()
        } else {
            format!("No .robot suites under {}/", app.settings.catalog.root)
        };
        let list = List::new([ListItem::new(Span::styled(
            message,
            Style::default().fg(theme::OVERLAY0),
        ))])
        .block(block);
        frame.render_widget(list, area);
        return;
    }

    // A rescan can leave the window past the end of a smaller tree.
    app.catalog_scroll = app.catalog_scroll.min(visible.len().saturating_sub(1));
    let end = (app.catalog_scroll + inner_height).min(visible.len());
    let items: Vec<ListItem> = visible[app.catalog_scroll..end]
        .iter()
        .enumerate()
        .map(|(view_i, &(node_id, depth))| {
            let absolute_i = view_i + app.catalog_scroll;
            let node = app.catalog.get(node_id).unwrap();
            let picked = app
                .selection_entry_for(node_id)
                .is_some_and(|entry| app.config.selection.contains(&entry));

            let indent = "  ".repeat(depth);
            let (icon, icon_color) = match node.kind {
                NodeKind::Module | NodeKind::Suite => {
                    let arrow = if node.expanded { "▼ " } else { "▶ " };
                    let color = if node.kind == NodeKind::Module {
                        theme::BLUE
                    } else {
                        theme::TEAL
                    };
                    (arrow, color)
                }
                NodeKind::Test => {
                    if picked {
                        ("● ", theme::GREEN)
                    } else {
                        ("○ ", theme::SUBTEXT0)
                    }
                }
            };

            let cursor_here = absolute_i == app.catalog_cursor && focused;
            let name_style = if cursor_here {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else if picked {
                Style::default().fg(theme::MAUVE)
            } else {
                Style::default()
            };

            let mut spans = vec![
                Span::raw(indent),
                Span::styled(icon, Style::default().fg(icon_color)),
                Span::styled(&node.name, name_style),
            ];
            if picked && node.kind != NodeKind::Test {
                spans.push(Span::styled(" ●", Style::default().fg(theme::GREEN)));
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items).block(block);
    frame.render_widget(list, area);
}

#[cfg(test)]
mod tests {
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::app::test_support::test_app;
    use crate::models::CatalogTree;

    #[test]
    fn a_stale_scroll_window_is_pinned_inside_the_tree() {
        let (mut app, _rx) = test_app();
        let mut tree = CatalogTree::new();
        tree.add_root(NodeKind::Suite, "smoke.robot".into(), "smoke.robot".into());
        app.catalog = tree;
        // Scroll state left over from a much larger tree.
        app.catalog_scroll = 80;

        let backend = TestBackend::new(40, 10);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| {
                let area = frame.area();
                draw(frame, &mut app, area);
            })
            .unwrap();

        assert_eq!(app.catalog_scroll, 0);
        let buffer = terminal.backend().buffer();
        let mut content = String::new();
        for y in 0..10u16 {
            for x in 0..40u16 {
                if let Some(cell) = buffer.cell((x, y)) {
                    content.push_str(cell.symbol());
                }
            }
        }
        assert!(content.contains("smoke.robot"));
    }
}
