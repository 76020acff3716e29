mod app;
mod browser;
mod catalog;
mod config;
mod debug;
mod editor;
mod models;
mod runner;
mod supervisor;
mod ui;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::prelude::*;
use tokio::time::{Duration, interval};

use app::{App, handle_action, handle_app_event, trigger_action};
use config::{SavedRun, Settings};
use debug::DebugLog;

#[tokio::main]
async fn main() -> Result<()> {
    // Setup terminal
    terminal::enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal).await;

    // Teardown terminal
    terminal::disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let settings = Settings::load(&workspace);
    let saved = SavedRun::load(&workspace);
    let debug = DebugLog::from_env();

    let (mut app, mut event_rx) = App::new(workspace, settings, saved, debug);
    app.request_scan();

    let mut tick = interval(Duration::from_millis(100));
    let mut event_stream = EventStream::new();

    loop {
        terminal.draw(|frame| ui::draw(frame, &mut app))?;

        tokio::select! {
            maybe_event = event_stream.next() => {
                match maybe_event {
                    None => break,
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(Event::Key(key))) => {
                        if let Some(action) =
                            trigger_action(key, app.editing.is_some(), app.filter_active)
                        {
                            handle_action(&mut app, action);
                        }
                    }
                    Some(Ok(_)) => {}
                }
            }

            Some(event) = event_rx.recv() => {
                handle_app_event(&mut app, event);
            }

            _ = tick.tick() => {
                if app.scanning || app.server.is_active() || app.run.is_active() {
                    app.spinner_tick = app.spinner_tick.wrapping_add(1);
                }
                app.notifier.prune_expired();
                if let Some(url) = app.browser_due()
                    && let Err(e) = browser::open(&url)
                {
                    app.notifier.error(e.to_string());
                }
            }
        }

        if let Some((path, line)) = app.pending_editor.take()
            && let Err(e) =
                editor::open(terminal, path, line, app.settings.editor.command.as_deref())
        {
            app.notifier.error(e.to_string());
        }

        if app.should_quit {
            let saved = SavedRun {
                mode: app.mode,
                config: app.config.clone(),
            };
            if let Err(e) = saved.save(&app.workspace) {
                app.debug.log(&format!("[state] {e:#}"));
            }
            app.server.shutdown();
            app.run.shutdown();
            break;
        }
    }

    Ok(())
}
