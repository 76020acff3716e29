use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use tui_input::backend::crossterm::EventHandler;

use crate::app::{App, Panel};
use crate::config::SavedRun;
use crate::models::{NodeKind, ServiceKind};
use crate::runner;
use crate::supervisor::{StartOutcome, StopOutcome};

#[derive(Debug)]
pub enum Action {
    Quit,
    FocusNext,
    FocusPrevious,
    NavigateUp,
    NavigateDown,
    ScrollUp,
    ScrollDown,
    Expand,
    ExpandAll,
    Collapse,
    CollapseAll,
    JumpToStart,
    JumpToEnd,
    Select,
    ToggleSelect,
    ClearSelection,
    RunTests,
    StopTests,
    StartServer,
    StopServer,
    RefreshCatalog,
    ToggleMode,
    CopyCommand,
    OpenInEditor,
    FilterEnter,
    FilterKey(KeyEvent),
    FilterApply,
    FilterExit,
    FieldKey(KeyEvent),
    FieldCommit,
    FieldCancel,
}

/// Process a keyboard action.
pub fn handle_action(app: &mut App, action: Action) {
    match action {
        Action::Quit => app.should_quit = true,

        Action::FocusNext => {
            app.active_panel = match app.active_panel {
                Panel::Catalog => Panel::Form,
                Panel::Form => Panel::Output,
                Panel::Output => Panel::Catalog,
            };
        }

        Action::FocusPrevious => {
            app.active_panel = match app.active_panel {
                Panel::Catalog => Panel::Output,
                Panel::Form => Panel::Catalog,
                Panel::Output => Panel::Form,
            };
        }

        Action::NavigateUp => match app.active_panel {
            Panel::Catalog => {
                app.catalog_cursor = app.catalog_cursor.saturating_sub(1);
                app.adjust_catalog_scroll();
            }
            Panel::Form => {
                app.form_cursor = app.form_cursor.saturating_sub(1);
            }
            Panel::Output => {
                app.output_follow = false;
                app.output_scroll = app.output_scroll.saturating_sub(1);
            }
        },

        Action::NavigateDown => match app.active_panel {
            Panel::Catalog => {
                let max = app.visible_catalog_nodes().len().saturating_sub(1);
                app.catalog_cursor = (app.catalog_cursor + 1).min(max);
                app.adjust_catalog_scroll();
            }
            Panel::Form => {
                let max = app.form_fields().len().saturating_sub(1);
                app.form_cursor = (app.form_cursor + 1).min(max);
            }
            Panel::Output => {
                app.output_scroll = app.output_scroll.saturating_add(1);
            }
        },

        Action::ScrollUp => {
            let half = (app.catalog_viewport / 2).max(1);
            match app.active_panel {
                Panel::Catalog => {
                    app.catalog_cursor = app.catalog_cursor.saturating_sub(half);
                    app.adjust_catalog_scroll();
                }
                Panel::Form => {
                    app.form_cursor = app.form_cursor.saturating_sub(half);
                }
                Panel::Output => {
                    app.output_follow = false;
                    app.output_scroll = app.output_scroll.saturating_sub(half as u16);
                }
            }
        }

        Action::ScrollDown => {
            let half = (app.catalog_viewport / 2).max(1);
            match app.active_panel {
                Panel::Catalog => {
                    let max = app.visible_catalog_nodes().len().saturating_sub(1);
                    app.catalog_cursor = (app.catalog_cursor + half).min(max);
                    app.adjust_catalog_scroll();
                }
                Panel::Form => {
                    let max = app.form_fields().len().saturating_sub(1);
                    app.form_cursor = (app.form_cursor + half).min(max);
                }
                Panel::Output => {
                    app.output_scroll = app.output_scroll.saturating_add(half as u16);
                }
            }
        }

        Action::Expand => {
            if app.active_panel == Panel::Catalog
                && let Some(node_id) = app.selected_catalog_node()
                && let Some(node) = app.catalog.get(node_id)
                && !node.children.is_empty()
                && !node.expanded
            {
                app.catalog.toggle_expanded(node_id);
            }
        }

        Action::ExpandAll => {
            if app.active_panel == Panel::Catalog {
                app.catalog.expand_all();
            }
        }

        Action::Collapse => {
            if app.active_panel == Panel::Catalog
                && let Some(node_id) = app.selected_catalog_node()
                && let Some(node) = app.catalog.get(node_id)
            {
                if node.expanded && !node.children.is_empty() {
                    app.catalog.toggle_expanded(node_id);
                } else if let Some(parent_id) = node.parent {
                    // Collapse navigates to the parent if already collapsed.
                    app.catalog.toggle_expanded(parent_id);
                    if let Some(pos) = app
                        .visible_catalog_nodes()
                        .iter()
                        .position(|&(id, _)| id == parent_id)
                    {
                        app.catalog_cursor = pos;
                        app.adjust_catalog_scroll();
                    }
                }
            }
        }

        Action::CollapseAll => {
            if app.active_panel == Panel::Catalog {
                app.catalog.collapse_all();
                app.catalog_cursor = 0;
                app.catalog_scroll = 0;
            }
        }

        Action::JumpToStart => match app.active_panel {
            Panel::Catalog => {
                app.catalog_cursor = 0;
                app.catalog_scroll = 0;
            }
            Panel::Form => app.form_cursor = 0,
            Panel::Output => {
                app.output_follow = false;
                app.output_scroll = 0;
            }
        },

        Action::JumpToEnd => match app.active_panel {
            Panel::Catalog => {
                let max = app.visible_catalog_nodes().len().saturating_sub(1);
                app.catalog_cursor = max;
                app.adjust_catalog_scroll();
            }
            Panel::Form => {
                app.form_cursor = app.form_fields().len().saturating_sub(1);
            }
            Panel::Output => {
                app.output_follow = true;
            }
        },

        Action::Select => match app.active_panel {
            Panel::Catalog => {
                if let Some(node_id) = app.selected_catalog_node()
                    && let Some(node) = app.catalog.get(node_id)
                {
                    if !node.children.is_empty() {
                        app.catalog.toggle_expanded(node_id);
                    } else {
                        toggle_selection(app, node_id);
                    }
                }
            }
            Panel::Form => app.begin_field_edit(),
            Panel::Output => {}
        },

        Action::ToggleSelect => {
            if app.active_panel == Panel::Catalog
                && let Some(node_id) = app.selected_catalog_node()
            {
                toggle_selection(app, node_id);
            }
        }

        Action::ClearSelection => {
            if app.config.selection.is_empty() {
                app.notifier.warn("selection is already empty");
            } else {
                let count = app.config.selection.len();
                app.config.selection.clear();
                app.notifier.info(format!("cleared {count} picks"), 2);
            }
        }

        Action::RunTests => match runner::test_run_spec(&app.settings, &app.config, app.mode) {
            Ok(spec) => {
                let echo = format!("$ {}", runner::display_command(&spec));
                match app.run.start(spec) {
                    StartOutcome::Dispatched => {
                        app.push_output(ServiceKind::TestRun, echo);
                        app.output_follow = true;
                        persist_last_run(app);
                    }
                    StartOutcome::AlreadyRunning => {
                        app.notifier.warn("a test run is already active");
                    }
                }
            }
            Err(e) => app.notifier.error(format!("cannot launch test run: {e}")),
        },

        Action::StopTests => match app.run.stop() {
            StopOutcome::Dispatched => app.notifier.info("stopping test run", 2),
            StopOutcome::NotRunning => app.notifier.warn("no test run is active"),
        },

        Action::StartServer => match runner::server_spec(&app.settings) {
            Ok(spec) => {
                let echo = format!("$ {}", runner::display_command(&spec));
                match app.server.start(spec) {
                    StartOutcome::Dispatched => {
                        app.push_output(ServiceKind::ResultsServer, echo);
                        app.output_follow = true;
                    }
                    StartOutcome::AlreadyRunning => {
                        app.notifier.warn("results server is already running");
                    }
                }
            }
            Err(e) => app.notifier.error(format!("cannot start results server: {e}")),
        },

        Action::StopServer => {
            app.browser_deadline = None;
            match app.server.stop() {
                StopOutcome::Dispatched => app.notifier.info("stopping results server", 2),
                StopOutcome::NotRunning => app.notifier.warn("results server is not running"),
            }
        }

        Action::RefreshCatalog => {
            if app.scanning {
                app.notifier.warn("catalog scan already in progress");
            } else {
                app.request_scan();
            }
        }

        Action::ToggleMode => {
            app.mode = app.mode.toggled();
            app.clamp_form_cursor();
            app.notifier.info(format!("{} mode", app.mode.label()), 2);
        }

        Action::CopyCommand => match runner::test_run_spec(&app.settings, &app.config, app.mode) {
            Ok(spec) => {
                let line = runner::display_command(&spec);
                match arboard::Clipboard::new().and_then(|mut clip| clip.set_text(line)) {
                    Ok(()) => app.notifier.info("command copied to clipboard", 2),
                    Err(e) => app.notifier.error(format!("clipboard unavailable: {e}")),
                }
            }
            Err(e) => app.notifier.error(format!("cannot compose command: {e}")),
        },

        Action::OpenInEditor => {
            if app.active_panel != Panel::Catalog {
                return;
            }
            let Some(node_id) = app.selected_catalog_node() else {
                return;
            };
            let Some(node) = app.catalog.get(node_id) else {
                return;
            };
            match node.kind {
                NodeKind::Module => app.notifier.warn("select a suite or test to open"),
                NodeKind::Suite | NodeKind::Test => {
                    let path = app
                        .workspace
                        .join(&app.settings.catalog.root)
                        .join(&node.rel_path);
                    app.pending_editor = Some((path, node.line));
                }
            }
        }

        Action::FilterEnter => {
            app.active_panel = Panel::Catalog;
            app.filter_active = true;
        }

        Action::FilterKey(key) => {
            app.filter.handle_event(&Event::Key(key));
            app.catalog_cursor = 0;
            app.catalog_scroll = 0;
        }

        Action::FilterApply => {
            app.filter_active = false;
        }

        Action::FilterExit => {
            app.filter.reset();
            app.filter_active = false;
            app.catalog_cursor = 0;
            app.catalog_scroll = 0;
        }

        Action::FieldKey(key) => {
            if let Some(input) = app.editing.as_mut() {
                input.handle_event(&Event::Key(key));
            }
        }

        Action::FieldCommit => app.commit_field_edit(),

        Action::FieldCancel => app.cancel_field_edit(),
    }
}

/// Map a key event to an action, routing through the edit buffer or the
/// filter box first when one of them owns the keyboard.
pub fn trigger_action(key: KeyEvent, editing: bool, filter_active: bool) -> Option<Action> {
    if editing {
        return match key.code {
            KeyCode::Esc => Some(Action::FieldCancel),
            KeyCode::Enter => Some(Action::FieldCommit),
            _ => Some(Action::FieldKey(key)),
        };
    }

    if filter_active {
        return match key.code {
            KeyCode::Esc => Some(Action::FilterExit),
            KeyCode::Enter => Some(Action::FilterApply),
            KeyCode::Up => Some(Action::NavigateUp),
            KeyCode::Down => Some(Action::NavigateDown),
            _ => Some(Action::FilterKey(key)),
        };
    }

    map_key(key)
}

fn map_key(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            KeyCode::Char('u') => Some(Action::ScrollUp),
            KeyCode::Char('d') => Some(Action::ScrollDown),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Tab => Some(Action::FocusNext),
        KeyCode::BackTab => Some(Action::FocusPrevious),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::NavigateUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::NavigateDown),
        KeyCode::Right | KeyCode::Char('l') => Some(Action::Expand),
        KeyCode::Char('L') => Some(Action::ExpandAll),
        KeyCode::Left | KeyCode::Char('h') => Some(Action::Collapse),
        KeyCode::Char('H') => Some(Action::CollapseAll),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::JumpToStart),
        KeyCode::Char('G') | KeyCode::End => Some(Action::JumpToEnd),
        KeyCode::Enter => Some(Action::Select),
        KeyCode::Char(' ') => Some(Action::ToggleSelect),
        KeyCode::Char('u') => Some(Action::ClearSelection),
        KeyCode::Char('r') => Some(Action::RunTests),
        KeyCode::Char('x') => Some(Action::StopTests),
        KeyCode::Char('s') => Some(Action::StartServer),
        KeyCode::Char('S') => Some(Action::StopServer),
        KeyCode::Char('R') => Some(Action::RefreshCatalog),
        KeyCode::Char('m') => Some(Action::ToggleMode),
        KeyCode::Char('y') => Some(Action::CopyCommand),
        KeyCode::Char('e') => Some(Action::OpenInEditor),
        KeyCode::Char('/') => Some(Action::FilterEnter),
        KeyCode::PageUp => Some(Action::ScrollUp),
        KeyCode::PageDown => Some(Action::ScrollDown),
        _ => None,
    }
}

fn toggle_selection(app: &mut App, node_id: usize) {
    let Some(entry) = app.selection_entry_for(node_id) else {
        return;
    };
    let name = entry.name.clone();
    if app.config.selection.toggle(entry) {
        app.notifier.info(format!("selected {name}"), 2);
    } else {
        app.notifier.info(format!("unselected {name}"), 2);
    }
}

/// Remember the launched configuration across sessions. Best-effort: a
/// write failure is logged, never surfaced.
fn persist_last_run(app: &App) {
    let saved = SavedRun { mode: app.mode, config: app.config.clone() };
    if let Err(e) = saved.save(&app.workspace) {
        app.debug.log(&format!("[state] {e:#}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::test_app;
    use crate::app::{App, NotificationKind};
    use crate::config::Settings;
    use crate::debug::DebugLog;
    use crate::models::ServiceStatus;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn seeded_catalog(app: &mut App) -> (usize, usize) {
        let suite = app.catalog.add_root(
            NodeKind::Suite,
            "login.robot".into(),
            "auth/login.robot".into(),
        );
        let test = app.catalog.add_child(
            suite,
            NodeKind::Test,
            "Valid Login".into(),
            "auth/login.robot".into(),
        );
        (suite, test)
    }

    #[test]
    fn keys_route_to_the_edit_buffer_first() {
        assert!(matches!(
            trigger_action(key(KeyCode::Enter), true, false),
            Some(Action::FieldCommit)
        ));
        assert!(matches!(
            trigger_action(key(KeyCode::Esc), true, false),
            Some(Action::FieldCancel)
        ));
        assert!(matches!(
            trigger_action(key(KeyCode::Char('q')), true, false),
            Some(Action::FieldKey(_))
        ));
        assert!(matches!(
            trigger_action(key(KeyCode::Char('q')), false, false),
            Some(Action::Quit)
        ));
    }

    #[test]
    fn filter_mode_captures_text_keys() {
        assert!(matches!(
            trigger_action(key(KeyCode::Char('r')), false, true),
            Some(Action::FilterKey(_))
        ));
        assert!(matches!(
            trigger_action(key(KeyCode::Esc), false, true),
            Some(Action::FilterExit)
        ));
    }

    #[test]
    fn control_chords_are_mapped() {
        let quit = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(matches!(trigger_action(quit, false, false), Some(Action::Quit)));
        let up = KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL);
        assert!(matches!(trigger_action(up, false, false), Some(Action::ScrollUp)));
    }

    #[test]
    fn filter_typing_narrows_and_escape_clears() {
        let (mut app, _rx) = test_app();
        seeded_catalog(&mut app);

        handle_action(&mut app, Action::FilterEnter);
        assert!(app.filter_active);
        handle_action(&mut app, Action::FilterKey(key(KeyCode::Char('l'))));
        handle_action(&mut app, Action::FilterKey(key(KeyCode::Char('o'))));
        assert_eq!(app.filter.value(), "lo");

        handle_action(&mut app, Action::FilterExit);
        assert!(!app.filter_active);
        assert_eq!(app.filter.value(), "");
    }

    #[test]
    fn space_toggles_a_pick_enter_expands_containers() {
        let (mut app, _rx) = test_app();
        let (suite, _test) = seeded_catalog(&mut app);

        // Enter on the collapsed suite expands it instead of picking it.
        handle_action(&mut app, Action::Select);
        assert!(app.catalog.get(suite).unwrap().expanded);
        assert!(app.config.selection.is_empty());

        // Space on the test row picks it; again unpicks.
        handle_action(&mut app, Action::NavigateDown);
        handle_action(&mut app, Action::ToggleSelect);
        assert_eq!(app.config.selection.len(), 1);
        handle_action(&mut app, Action::ToggleSelect);
        assert!(app.config.selection.is_empty());
    }

    #[test]
    fn clear_selection_warns_when_empty() {
        let (mut app, _rx) = test_app();
        handle_action(&mut app, Action::ClearSelection);
        assert_eq!(app.notifier.recent().unwrap().kind, NotificationKind::Warn);
    }

    #[test]
    fn open_in_editor_targets_the_suite_file_and_line() {
        let (mut app, _rx) = test_app();
        let (suite, test) = seeded_catalog(&mut app);
        app.catalog.get_mut(test).unwrap().line = Some(7);
        app.catalog.toggle_expanded(suite);

        app.catalog_cursor = 1; // the test row
        handle_action(&mut app, Action::OpenInEditor);
        let (path, line) = app.pending_editor.take().unwrap();
        assert!(path.ends_with("tests/auth/login.robot"));
        assert_eq!(line, Some(7));

        app.catalog_cursor = 0; // the suite row
        handle_action(&mut app, Action::OpenInEditor);
        let (_, line) = app.pending_editor.take().unwrap();
        assert_eq!(line, None);
    }

    #[test]
    fn mode_toggle_keeps_the_form_cursor_in_range() {
        let (mut app, _rx) = test_app();
        app.active_panel = Panel::Form;
        app.form_cursor = app.form_fields().len() - 1;
        handle_action(&mut app, Action::ToggleMode);
        assert!(app.form_cursor < app.form_fields().len());
        assert_eq!(app.mode.label(), "container");
    }

    #[test]
    fn stop_requests_warn_when_nothing_runs() {
        let (mut app, _rx) = test_app();
        handle_action(&mut app, Action::StopTests);
        assert_eq!(app.notifier.recent().unwrap().kind, NotificationKind::Warn);
        handle_action(&mut app, Action::StopServer);
        assert_eq!(app.notifier.recent().unwrap().kind, NotificationKind::Warn);
    }

    #[tokio::test]
    async fn run_dispatch_echoes_and_persists_the_configuration() {
        let dir = tempfile::TempDir::new().unwrap();
        let (mut app, _rx) = App::new(
            dir.path().to_path_buf(),
            Settings::default(),
            None,
            DebugLog::disabled(),
        );

        handle_action(&mut app, Action::RunTests);
        assert_eq!(app.run.status(), ServiceStatus::Starting);
        assert!(app.output_lines[0].starts_with("$ scripts/run_tests.sh"));
        assert!(dir.path().join(".gantry/last_run.json").exists());

        handle_action(&mut app, Action::RunTests);
        assert_eq!(app.notifier.recent().unwrap().kind, NotificationKind::Warn);
        assert_eq!(app.output_lines.len(), 1);
    }

    #[tokio::test]
    async fn server_dispatch_tags_the_echo_line() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut settings = Settings::default();
        // Port 0 keeps the background port sweep away from real listeners.
        settings.server.port = 0;
        let (mut app, _rx) =
            App::new(dir.path().to_path_buf(), settings, None, DebugLog::disabled());

        handle_action(&mut app, Action::StartServer);
        assert_eq!(app.server.status(), ServiceStatus::Starting);
        assert!(app.output_lines[0].starts_with("[server] $"));
        assert!(app.output_lines[0].contains("--port 0"));
    }
}
