use std::time::{Duration, Instant};

use crate::app::App;
use crate::models::{CatalogTree, ServiceKind};

/// How long after a successful server start the results page is opened.
/// Long enough for the script to bind the port, short enough to feel
/// immediate.
const BROWSER_DELAY: Duration = Duration::from_millis(800);

/// Events posted by supervisor tasks and the catalog scan. All app-state
/// mutation funnels through here, on the event-loop side.
#[derive(Debug)]
pub enum AppEvent {
    ServiceStarted {
        kind: ServiceKind,
        pid: u32,
        port: Option<u16>,
    },
    SpawnFailed {
        kind: ServiceKind,
        message: String,
    },
    Output {
        kind: ServiceKind,
        line: String,
    },
    ServiceExited {
        kind: ServiceKind,
        pid: u32,
        code: Option<i32>,
    },
    ServiceStopped {
        kind: ServiceKind,
        error: Option<String>,
    },
    CatalogLoaded {
        tree: CatalogTree,
    },
}

/// Process one event from a background task.
pub fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::ServiceStarted { kind, pid, port } => {
            app.supervisor_mut(kind).mark_started(pid, port);
            match kind {
                ServiceKind::ResultsServer => {
                    let port = port.unwrap_or(app.settings.server.port);
                    app.notifier
                        .info(format!("results server running on port {port}"), 3);
                    app.browser_deadline = Some(Instant::now() + BROWSER_DELAY);
                }
                ServiceKind::TestRun => {
                    app.run_start = Some(Instant::now());
                }
            }
        }

        AppEvent::SpawnFailed { kind, message } => {
            app.supervisor_mut(kind).mark_spawn_failed();
            if kind == ServiceKind::TestRun {
                app.run_start = None;
            }
            app.push_output(kind, format!("[error] {message}"));
            app.notifier.error(message);
        }

        AppEvent::Output { kind, line } => {
            app.push_output(kind, line);
        }

        AppEvent::ServiceExited { kind, pid, code } => {
            if !app.supervisor_mut(kind).process_exited(pid) {
                // An earlier incarnation, or a child already being stopped.
                app.debug
                    .log(&format!("[{}] stale exit of pid {pid} ignored", kind.label()));
                return;
            }
            match kind {
                ServiceKind::TestRun => {
                    app.run_start = None;
                    match code {
                        Some(0) => app.notifier.info("test run finished", 4),
                        Some(n) => app.notifier.error(format!("test run failed (exit {n})")),
                        None => app.notifier.warn("test run ended by signal"),
                    }
                }
                ServiceKind::ResultsServer => {
                    app.browser_deadline = None;
                    match code {
                        Some(0) => app.notifier.info("results server exited", 3),
                        Some(n) => {
                            app.notifier.error(format!("results server exited with code {n}"))
                        }
                        None => app.notifier.warn("results server ended by signal"),
                    }
                }
            }
        }

        AppEvent::ServiceStopped { kind, error } => {
            app.supervisor_mut(kind).mark_stopped();
            match kind {
                ServiceKind::TestRun => app.run_start = None,
                ServiceKind::ResultsServer => app.browser_deadline = None,
            }
            match error {
                Some(message) => app.notifier.error(message),
                None => app.notifier.info(format!("{} stopped", kind.label()), 3),
            }
        }

        AppEvent::CatalogLoaded { tree } => {
            let (suites, tests) = tree.totals();
            app.catalog = tree;
            app.scanning = false;
            let max = app.visible_catalog_nodes().len().saturating_sub(1);
            app.catalog_cursor = app.catalog_cursor.min(max);
            // The window never starts past the cursor row.
            app.catalog_scroll = app.catalog_scroll.min(app.catalog_cursor);
            app.notifier
                .info(format!("catalog: {suites} suites, {tests} tests"), 2);
        }
    }
}
