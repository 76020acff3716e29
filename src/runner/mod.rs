pub mod command;

use anyhow::{Context, Result, bail};

use crate::config::{ExecutionMode, RunConfig, Settings};

/// A fully resolved invocation: the program, its arguments, and the port the
/// service is expected to bind (used to clear conflicts before spawning and
/// as a termination fallback).
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub port: Option<u16>,
}

/// Resolve the results-server invocation from the configured script.
pub fn server_spec(settings: &Settings) -> Result<LaunchSpec> {
    let mut parts = split_script(&settings.server.script)?;
    let program = parts.remove(0);
    parts.push("--port".to_string());
    parts.push(settings.server.port.to_string());
    Ok(LaunchSpec { program, args: parts, port: Some(settings.server.port) })
}

/// Resolve the test-run invocation: the mode's script plus the composed argv.
pub fn test_run_spec(
    settings: &Settings,
    config: &RunConfig,
    mode: ExecutionMode,
) -> Result<LaunchSpec> {
    let script = match mode {
        ExecutionMode::Local => &settings.runner.local_script,
        ExecutionMode::Container => &settings.runner.container_script,
    };
    let mut parts = split_script(script)?;
    let program = parts.remove(0);
    parts.extend(command::build_args(config, mode, &settings.catalog.root));
    Ok(LaunchSpec { program, args: parts, port: None })
}

/// Render the invocation as one shell-quoted line for the output pane echo
/// and the clipboard.
pub fn display_command(spec: &LaunchSpec) -> String {
    shell_words::join(
        std::iter::once(spec.program.as_str()).chain(spec.args.iter().map(String::as_str)),
    )
}

/// Split a configured script string into argv, so entries like
/// `"bash scripts/run.sh"` work.
fn split_script(script: &str) -> Result<Vec<String>> {
    let parts = shell_words::split(script)
        .with_context(|| format!("invalid script line: {script}"))?;
    if parts.is_empty() {
        bail!("script is not configured");
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_spec_appends_port() {
        let settings = Settings::default();
        let spec = server_spec(&settings).unwrap();
        assert_eq!(spec.program, "scripts/start_results_server.sh");
        assert_eq!(spec.args, vec!["--port", "8000"]);
        assert_eq!(spec.port, Some(8000));
    }

    #[test]
    fn script_line_with_interpreter_splits() {
        let mut settings = Settings::default();
        settings.runner.local_script = "bash scripts/run_tests.sh".to_string();
        let spec = test_run_spec(&settings, &RunConfig::default(), ExecutionMode::Local).unwrap();
        assert_eq!(spec.program, "bash");
        assert_eq!(spec.args[0], "scripts/run_tests.sh");
        assert_eq!(spec.port, None);
    }

    #[test]
    fn container_mode_uses_container_script() {
        let settings = Settings::default();
        let spec =
            test_run_spec(&settings, &RunConfig::default(), ExecutionMode::Container).unwrap();
        assert_eq!(spec.program, "scripts/run_tests_container.sh");
    }

    #[test]
    fn empty_script_is_an_error() {
        let mut settings = Settings::default();
        settings.server.script = "   ".to_string();
        assert!(server_spec(&settings).is_err());
    }

    #[test]
    fn display_command_quotes_spaced_arguments() {
        let config = RunConfig { report_title: "Nightly Build".into(), ..Default::default() };
        let spec = test_run_spec(&Settings::default(), &config, ExecutionMode::Local).unwrap();
        let line = display_command(&spec);
        assert!(line.starts_with("scripts/run_tests.sh"));
        assert!(line.contains("--report-title 'Nightly Build'"));
    }
}
