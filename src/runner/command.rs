use crate::config::{ExecutionMode, RunConfig, SelectionKind};

/// Window size substituted when the form fields are left empty.
pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;

/// Compose the runner argv from one configuration snapshot.
///
/// Pure and deterministic: no filesystem access, no validation beyond the
/// window-size fallback. Paths always come last so the scripts can treat
/// every trailing argument as a suite location. Mode-exclusive options are
/// never emitted for the other mode.
pub fn build_args(config: &RunConfig, mode: ExecutionMode, tests_root: &str) -> Vec<String> {
    let mut args = Vec::new();

    if config.headless {
        args.push("--headless".to_string());
    }
    if mode == ExecutionMode::Local {
        if config.install_deps {
            args.push("--install-deps".to_string());
        }
        if config.install_browsers {
            args.push("--install-browsers".to_string());
        }
    }
    if mode == ExecutionMode::Container && !config.image.trim().is_empty() {
        push_pair(&mut args, "--image", config.image.trim());
    }

    if !config.environment.trim().is_empty() {
        push_pair(&mut args, "--env", config.environment.trim());
    }

    let width = config.width.unwrap_or(DEFAULT_WIDTH);
    let height = config.height.unwrap_or(DEFAULT_HEIGHT);
    push_pair(&mut args, "--width", &width.to_string());
    push_pair(&mut args, "--height", &height.to_string());

    push_pair(&mut args, "--video", on_off(config.video));
    push_pair(&mut args, "--trace", on_off(config.trace));
    push_pair(&mut args, "--loglevel", config.log_level.as_arg());

    if !config.report_title.trim().is_empty() {
        push_pair(&mut args, "--report-title", config.report_title.trim());
    }

    for line in config.variables.lines() {
        let line = line.trim();
        if !line.is_empty() {
            push_pair(&mut args, "-v", line);
        }
    }

    let (test_filters, paths) = resolve_selection(config, tests_root);
    for name in test_filters {
        push_pair(&mut args, "--test", &name);
    }
    args.extend(paths);

    args
}

/// Pick the one selection source that wins: a custom path overrides the
/// structured selection, which overrides the catalog root. Returns the
/// per-test name filters and the suite paths, both deduplicated in pick
/// order.
fn resolve_selection(config: &RunConfig, tests_root: &str) -> (Vec<String>, Vec<String>) {
    let custom = config.custom_path.trim();
    if !custom.is_empty() {
        return (Vec::new(), vec![custom.to_string()]);
    }

    if config.selection.is_empty() {
        return (Vec::new(), vec![tests_root.to_string()]);
    }

    let mut filters: Vec<String> = Vec::new();
    let mut paths: Vec<String> = Vec::new();
    for entry in &config.selection.entries {
        if entry.kind == SelectionKind::Test
            && let Some(name) = &entry.test_name
            && !filters.contains(name)
        {
            filters.push(name.clone());
        }
        if !paths.contains(&entry.path) {
            paths.push(entry.path.clone());
        }
    }
    (filters, paths)
}

fn push_pair(args: &mut Vec<String>, flag: &str, value: &str) {
    args.push(flag.to_string());
    args.push(value.to_string());
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
