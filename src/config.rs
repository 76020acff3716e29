use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

const STATE_DIR: &str = ".gantry";
const STATE_FILE: &str = "last_run.json";

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub runner: RunnerSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub editor: EditorSettings,
    /// Optional baseline overrides applied to the default run configuration.
    #[serde(default)]
    pub defaults: RunConfigPatch,
}

/// Results-server port and launch script.
#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_server_script")]
    pub script: String,
}

/// Launch scripts for the two execution modes.
#[derive(Debug, Deserialize)]
pub struct RunnerSettings {
    #[serde(default = "default_local_script")]
    pub local_script: String,
    #[serde(default = "default_container_script")]
    pub container_script: String,
}

/// Where suite files live, relative to the workspace root.
#[derive(Debug, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_catalog_root")]
    pub root: String,
}

/// Overrides the editor used when opening suite files.
#[derive(Debug, Default, Deserialize)]
pub struct EditorSettings {
    /// Binary name or path to use instead of `$EDITOR`.
    /// The argument format is auto-detected from the binary name.
    /// Example: "nvim" or "/usr/local/bin/hx"
    pub command: Option<String>,
}

fn default_port() -> u16 {
    8000
}

fn default_server_script() -> String {
    "scripts/start_results_server.sh".to_string()
}

fn default_local_script() -> String {
    "scripts/run_tests.sh".to_string()
}

fn default_container_script() -> String {
    "scripts/run_tests_container.sh".to_string()
}

fn default_catalog_root() -> String {
    "tests".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: default_port(), script: default_server_script() }
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            local_script: default_local_script(),
            container_script: default_container_script(),
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self { root: default_catalog_root() }
    }
}

impl Settings {
    /// Load `gantry.toml` from the workspace root, falling back to defaults if absent or invalid.
    pub fn load(workspace: &Path) -> Self {
        let path = workspace.join("gantry.toml");
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        toml::from_str(&content).unwrap_or_default()
    }
}

/// Whether tests run on the host or inside the container image.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Local,
    Container,
}

impl ExecutionMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Container => "container",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Local => Self::Container,
            Self::Container => Self::Local,
        }
    }
}

/// Runner verbosity, passed through as `--loglevel`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
}

impl LogLevel {
    pub fn as_arg(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            Self::Trace => Self::Debug,
            Self::Debug => Self::Info,
            Self::Info => Self::Warn,
            Self::Warn => Self::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionKind {
    Module,
    Suite,
    Test,
}

/// One picked catalog node. `test_name` is set for test nodes only; `path`
/// is the suite (or directory) path relative to the catalog root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub kind: SelectionKind,
    pub name: String,
    pub path: String,
    pub test_name: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestSelection {
    pub entries: Vec<SelectionEntry>,
}

impl TestSelection {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, entry: &SelectionEntry) -> bool {
        self.entries
            .iter()
            .any(|e| e.path == entry.path && e.test_name == entry.test_name)
    }

    /// Add the entry, or remove it if an identical pick is already present.
    /// Returns true if the entry ended up selected.
    pub fn toggle(&mut self, entry: SelectionEntry) -> bool {
        if let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.path == entry.path && e.test_name == entry.test_name)
        {
            self.entries.remove(pos);
            false
        } else {
            self.entries.push(entry);
            true
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Everything the command builder needs for one run. Flat primitives so the
/// whole record serializes into the persisted last-run state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub environment: String,
    /// Browser window size; empty fields fall back to 1920x1080 at build time.
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub headless: bool,
    pub video: bool,
    pub trace: bool,
    pub log_level: LogLevel,
    pub report_title: String,
    /// One `name:value` pair per line; blank lines are dropped at build time.
    pub variables: String,
    /// Container image, used in container mode only.
    pub image: String,
    pub install_deps: bool,
    pub install_browsers: bool,
    /// Explicit path override; wins over the structured selection.
    pub custom_path: String,
    pub selection: TestSelection,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            environment: String::new(),
            width: None,
            height: None,
            headless: false,
            video: false,
            trace: false,
            log_level: LogLevel::default(),
            report_title: String::new(),
            variables: String::new(),
            image: String::new(),
            install_deps: false,
            install_browsers: false,
            custom_path: String::new(),
            selection: TestSelection::default(),
        }
    }
}

impl RunConfig {
    /// Merge a partial override field-by-field; `None` leaves the field alone.
    pub fn apply(&mut self, patch: RunConfigPatch) {
        if let Some(environment) = patch.environment {
            self.environment = environment;
        }
        if let Some(width) = patch.width {
            self.width = Some(width);
        }
        if let Some(height) = patch.height {
            self.height = Some(height);
        }
        if let Some(headless) = patch.headless {
            self.headless = headless;
        }
        if let Some(video) = patch.video {
            self.video = video;
        }
        if let Some(trace) = patch.trace {
            self.trace = trace;
        }
        if let Some(log_level) = patch.log_level {
            self.log_level = log_level;
        }
        if let Some(report_title) = patch.report_title {
            self.report_title = report_title;
        }
        if let Some(variables) = patch.variables {
            self.variables = variables;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
        if let Some(install_deps) = patch.install_deps {
            self.install_deps = install_deps;
        }
        if let Some(install_browsers) = patch.install_browsers {
            self.install_browsers = install_browsers;
        }
        if let Some(custom_path) = patch.custom_path {
            self.custom_path = custom_path;
        }
    }
}

/// Partial `RunConfig`, used by the `[defaults]` table in `gantry.toml`.
/// The selection is runtime state and deliberately not patchable.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfigPatch {
    pub environment: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub headless: Option<bool>,
    pub video: Option<bool>,
    pub trace: Option<bool>,
    pub log_level: Option<LogLevel>,
    pub report_title: Option<String>,
    pub variables: Option<String>,
    pub image: Option<String>,
    pub install_deps: Option<bool>,
    pub install_browsers: Option<bool>,
    pub custom_path: Option<String>,
}

/// Last launched run, persisted across sessions.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedRun {
    pub mode: ExecutionMode,
    pub config: RunConfig,
}

impl SavedRun {
    /// Load the previous session's state, if any. Invalid state is discarded.
    pub fn load(workspace: &Path) -> Option<Self> {
        let path = workspace.join(STATE_DIR).join(STATE_FILE);
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn save(&self, workspace: &Path) -> anyhow::Result<()> {
        let dir = workspace.join(STATE_DIR);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(STATE_FILE), content)
            .with_context(|| "failed to write last-run state")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_settings_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path());
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.catalog.root, "tests");
        assert_eq!(settings.runner.local_script, "scripts/run_tests.sh");
        assert!(settings.editor.command.is_none());
    }

    #[test]
    fn partial_settings_keep_section_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("gantry.toml"),
            "[server]\nport = 9100\n\n[defaults]\nheadless = true\nenvironment = \"staging\"\n",
        )
        .unwrap();

        let settings = Settings::load(dir.path());
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.script, "scripts/start_results_server.sh");

        let mut config = RunConfig::default();
        config.apply(settings.defaults);
        assert!(config.headless);
        assert_eq!(config.environment, "staging");
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn invalid_settings_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("gantry.toml"), "[server\nport = ").unwrap();
        assert_eq!(Settings::load(dir.path()).server.port, 8000);
    }

    #[test]
    fn patch_overrides_only_present_fields() {
        let mut config = RunConfig { video: true, ..Default::default() };
        config.apply(RunConfigPatch {
            environment: Some("qa".into()),
            width: Some(1280),
            ..Default::default()
        });
        assert_eq!(config.environment, "qa");
        assert_eq!(config.width, Some(1280));
        assert!(config.video);
        assert_eq!(config.height, None);
    }

    #[test]
    fn selection_toggle_adds_then_removes() {
        let mut selection = TestSelection::default();
        let entry = SelectionEntry {
            kind: SelectionKind::Test,
            name: "Login Works".into(),
            path: "auth/login.robot".into(),
            test_name: Some("Login Works".into()),
        };
        assert!(selection.toggle(entry.clone()));
        assert!(selection.contains(&entry));
        assert!(!selection.toggle(entry.clone()));
        assert!(selection.is_empty());
    }

    #[test]
    fn same_suite_different_tests_are_distinct_picks() {
        let mut selection = TestSelection::default();
        let first = SelectionEntry {
            kind: SelectionKind::Test,
            name: "A".into(),
            path: "auth/login.robot".into(),
            test_name: Some("A".into()),
        };
        let second = SelectionEntry { test_name: Some("B".into()), ..first.clone() };
        selection.toggle(first);
        selection.toggle(second);
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn saved_run_round_trips_and_tolerates_absence() {
        let dir = TempDir::new().unwrap();
        assert!(SavedRun::load(dir.path()).is_none());

        let saved = SavedRun {
            mode: ExecutionMode::Container,
            config: RunConfig { image: "tests:latest".into(), ..Default::default() },
        };
        saved.save(dir.path()).unwrap();

        let loaded = SavedRun::load(dir.path()).unwrap();
        assert_eq!(loaded.mode, ExecutionMode::Container);
        assert_eq!(loaded.config.image, "tests:latest");
    }

    #[test]
    fn log_level_cycles_through_all_levels() {
        let mut level = LogLevel::Info;
        let mut seen = vec![level.as_arg()];
        for _ in 0..3 {
            level = level.cycle();
            seen.push(level.as_arg());
        }
        assert_eq!(seen, vec!["INFO", "WARN", "TRACE", "DEBUG"]);
        assert_eq!(level.cycle(), LogLevel::Info);
    }
}
