use std::path::PathBuf;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::config::{
    ExecutionMode, RunConfig, SavedRun, SelectionEntry, SelectionKind, Settings,
};
use crate::debug::DebugLog;
use crate::models::{CatalogTree, NodeKind, ServiceKind, ServiceStatus};
use crate::supervisor::Supervisor;

pub mod actions;
pub mod events;
pub mod notifier;

pub use actions::{Action, handle_action, trigger_action};
pub use events::{AppEvent, handle_app_event};
pub use notifier::NotificationKind;
use notifier::Notifier;

/// Output buffer bound; the oldest chunk is dropped once it is exceeded.
const MAX_OUTPUT_LINES: usize = 5000;
const OUTPUT_TRIM: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Catalog,
    Form,
    Output,
}

/// One row of the run-options form. The row set depends on the execution
/// mode: the image row only exists in container mode, the install rows only
/// locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Environment,
    Width,
    Height,
    Headless,
    Video,
    Trace,
    LogLevel,
    ReportTitle,
    Variables,
    Image,
    InstallDeps,
    InstallBrowsers,
    CustomPath,
}

impl FormField {
    pub fn all_for(mode: ExecutionMode) -> Vec<FormField> {
        let mut fields = vec![
            Self::Environment,
            Self::Width,
            Self::Height,
            Self::Headless,
            Self::Video,
            Self::Trace,
            Self::LogLevel,
            Self::ReportTitle,
            Self::Variables,
        ];
        match mode {
            ExecutionMode::Container => fields.push(Self::Image),
            ExecutionMode::Local => {
                fields.push(Self::InstallDeps);
                fields.push(Self::InstallBrowsers);
            }
        }
        fields.push(Self::CustomPath);
        fields
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Environment => "Environment",
            Self::Width => "Width",
            Self::Height => "Height",
            Self::Headless => "Headless",
            Self::Video => "Video",
            Self::Trace => "Trace",
            Self::LogLevel => "Log level",
            Self::ReportTitle => "Report title",
            Self::Variables => "Variables",
            Self::Image => "Image",
            Self::InstallDeps => "Install deps",
            Self::InstallBrowsers => "Install browsers",
            Self::CustomPath => "Custom path",
        }
    }

    /// Text rows open an edit buffer; the rest toggle or cycle in place.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            Self::Environment
                | Self::Width
                | Self::Height
                | Self::ReportTitle
                | Self::Variables
                | Self::Image
                | Self::CustomPath
        )
    }
}

pub struct App {
    pub workspace: PathBuf,
    pub settings: Settings,
    pub debug: DebugLog,

    pub mode: ExecutionMode,
    pub config: RunConfig,

    pub catalog: CatalogTree,
    pub scanning: bool,
    pub catalog_cursor: usize,
    pub catalog_scroll: usize,
    pub catalog_viewport: usize,
    pub filter_active: bool,
    pub filter: tui_input::Input,

    pub active_panel: Panel,
    pub form_cursor: usize,
    /// Edit buffer for the focused text field; `None` when not editing.
    pub editing: Option<tui_input::Input>,

    pub output_lines: Vec<String>,
    pub output_scroll: u16,
    /// When set, the output pane sticks to the newest line.
    pub output_follow: bool,

    pub server: Supervisor,
    pub run: Supervisor,
    pub event_tx: mpsc::UnboundedSender<AppEvent>,

    pub run_start: Option<Instant>,
    pub browser_deadline: Option<Instant>,
    /// Suite file (absolute) and line to open once the loop regains control.
    pub pending_editor: Option<(PathBuf, Option<u32>)>,
    pub spinner_tick: usize,
    pub should_quit: bool,
    pub notifier: Notifier,
}

impl App {
    pub fn new(
        workspace: PathBuf,
        settings: Settings,
        saved: Option<SavedRun>,
        debug: DebugLog,
    ) -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut config = RunConfig::default();
        config.apply(settings.defaults.clone());
        let mut mode = ExecutionMode::default();
        if let Some(saved) = saved {
            config = saved.config;
            mode = saved.mode;
        }

        let app = Self {
            workspace,
            debug: debug.clone(),
            mode,
            config,
            catalog: CatalogTree::new(),
            scanning: false,
            catalog_cursor: 0,
            catalog_scroll: 0,
            catalog_viewport: 0,
            filter_active: false,
            filter: tui_input::Input::default(),
            active_panel: Panel::Catalog,
            form_cursor: 0,
            editing: None,
            output_lines: Vec::new(),
            output_scroll: 0,
            output_follow: true,
            server: Supervisor::new(ServiceKind::ResultsServer, event_tx.clone(), debug.clone()),
            run: Supervisor::new(ServiceKind::TestRun, event_tx.clone(), debug),
            event_tx,
            run_start: None,
            browser_deadline: None,
            pending_editor: None,
            spinner_tick: 0,
            should_quit: false,
            notifier: Notifier::new(),
            settings,
        };
        (app, event_rx)
    }

    pub fn supervisor_mut(&mut self, kind: ServiceKind) -> &mut Supervisor {
        match kind {
            ServiceKind::ResultsServer => &mut self.server,
            ServiceKind::TestRun => &mut self.run,
        }
    }

    /// Kick off a catalog scan on the blocking pool; the result comes back
    /// as a `CatalogLoaded` event.
    pub fn request_scan(&mut self) {
        if self.scanning {
            return;
        }
        self.scanning = true;
        let root = self.workspace.join(&self.settings.catalog.root);
        let tx = self.event_tx.clone();
        let debug = self.debug.clone();
        tokio::task::spawn_blocking(move || {
            let tree = crate::catalog::scan(&root, &debug);
            let _ = tx.send(AppEvent::CatalogLoaded { tree });
        });
    }

    /// Returns visible catalog rows respecting the current filter query.
    pub fn visible_catalog_nodes(&self) -> Vec<(usize, usize)> {
        let query = self.filter.value();
        if query.is_empty() {
            self.catalog.visible_nodes()
        } else {
            self.catalog.visible_nodes_filtered(query)
        }
    }

    pub fn selected_catalog_node(&self) -> Option<usize> {
        self.visible_catalog_nodes()
            .get(self.catalog_cursor)
            .map(|&(id, _)| id)
    }

    /// Build the selection pick for a catalog node. Test picks carry their
    /// suite's path so the builder can emit the path alongside the name
    /// filter.
    pub fn selection_entry_for(&self, id: usize) -> Option<SelectionEntry> {
        let node = self.catalog.get(id)?;
        let entry = match node.kind {
            NodeKind::Module => SelectionEntry {
                kind: SelectionKind::Module,
                name: node.name.clone(),
                path: node.rel_path.clone(),
                test_name: None,
            },
            NodeKind::Suite => SelectionEntry {
                kind: SelectionKind::Suite,
                name: node.name.clone(),
                path: node.rel_path.clone(),
                test_name: None,
            },
            NodeKind::Test => SelectionEntry {
                kind: SelectionKind::Test,
                name: node.name.clone(),
                path: node.rel_path.clone(),
                test_name: Some(node.name.clone()),
            },
        };
        Some(entry)
    }

    pub fn form_fields(&self) -> Vec<FormField> {
        FormField::all_for(self.mode)
    }

    pub fn current_field(&self) -> Option<FormField> {
        self.form_fields().get(self.form_cursor).copied()
    }

    /// Current text of a field, as shown in the form and seeded into the
    /// edit buffer. Variables collapse to one line with `;` separators.
    pub fn text_value(&self, field: FormField) -> String {
        match field {
            FormField::Environment => self.config.environment.clone(),
            FormField::Width => self.config.width.map(|w| w.to_string()).unwrap_or_default(),
            FormField::Height => self.config.height.map(|h| h.to_string()).unwrap_or_default(),
            FormField::ReportTitle => self.config.report_title.clone(),
            FormField::Variables => self.config.variables.replace('\n', "; "),
            FormField::Image => self.config.image.clone(),
            FormField::CustomPath => self.config.custom_path.clone(),
            _ => String::new(),
        }
    }

    /// Enter edit mode on a text row, or flip a toggle/cycle row in place.
    pub fn begin_field_edit(&mut self) {
        let Some(field) = self.current_field() else {
            return;
        };
        if field.is_text() {
            self.editing = Some(tui_input::Input::new(self.text_value(field)));
        } else {
            self.toggle_field(field);
        }
    }

    fn toggle_field(&mut self, field: FormField) {
        match field {
            FormField::Headless => self.config.headless = !self.config.headless,
            FormField::Video => self.config.video = !self.config.video,
            FormField::Trace => self.config.trace = !self.config.trace,
            FormField::LogLevel => self.config.log_level = self.config.log_level.cycle(),
            FormField::InstallDeps => self.config.install_deps = !self.config.install_deps,
            FormField::InstallBrowsers => {
                self.config.install_browsers = !self.config.install_browsers
            }
            _ => {}
        }
    }

    /// Parse and store the edit buffer. A bad number keeps the buffer open
    /// so the value can be corrected instead of silently discarded.
    pub fn commit_field_edit(&mut self) {
        let Some(input) = self.editing.take() else {
            return;
        };
        let Some(field) = self.current_field() else {
            return;
        };
        let value = input.value().trim().to_string();
        match field {
            FormField::Width => match parse_dimension(&value) {
                Some(width) => self.config.width = width,
                None => {
                    self.notifier.error("width must be a whole number");
                    self.editing = Some(input);
                }
            },
            FormField::Height => match parse_dimension(&value) {
                Some(height) => self.config.height = height,
                None => {
                    self.notifier.error("height must be a whole number");
                    self.editing = Some(input);
                }
            },
            FormField::Environment => self.config.environment = value,
            FormField::ReportTitle => self.config.report_title = value,
            FormField::Image => self.config.image = value,
            FormField::CustomPath => self.config.custom_path = value,
            FormField::Variables => {
                self.config.variables = value
                    .split(';')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
            }
            _ => {}
        }
    }

    pub fn cancel_field_edit(&mut self) {
        self.editing = None;
    }

    pub fn push_output(&mut self, kind: ServiceKind, line: String) {
        let line = match kind {
            ServiceKind::ResultsServer => format!("[server] {line}"),
            ServiceKind::TestRun => line,
        };
        self.output_lines.push(line);
        if self.output_lines.len() > MAX_OUTPUT_LINES {
            self.output_lines.drain(..OUTPUT_TRIM);
        }
    }

    /// The results-page URL, once the post-start delay has elapsed and the
    /// server is still up. Clears the deadline either way.
    pub fn browser_due(&mut self) -> Option<String> {
        let deadline = self.browser_deadline?;
        if Instant::now() < deadline {
            return None;
        }
        self.browser_deadline = None;
        if self.server.status() == ServiceStatus::Running {
            Some(format!("http://localhost:{}", self.settings.server.port))
        } else {
            None
        }
    }

    pub fn elapsed_run_secs(&self) -> Option<u64> {
        self.run_start.map(|start| start.elapsed().as_secs())
    }

    pub(crate) fn adjust_catalog_scroll(&mut self) {
        if self.catalog_viewport == 0 {
            return;
        }
        if self.catalog_cursor < self.catalog_scroll {
            self.catalog_scroll = self.catalog_cursor;
        } else if self.catalog_cursor >= self.catalog_scroll + self.catalog_viewport {
            self.catalog_scroll = self.catalog_cursor - self.catalog_viewport + 1;
        }
    }

    pub(crate) fn clamp_form_cursor(&mut self) {
        let max = self.form_fields().len().saturating_sub(1);
        self.form_cursor = self.form_cursor.min(max);
    }
}

fn parse_dimension(value: &str) -> Option<Option<u32>> {
    if value.is_empty() {
        return Some(None);
    }
    value.parse::<u32>().ok().map(Some)
}
