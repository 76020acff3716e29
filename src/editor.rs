use std::path::PathBuf;
use std::{io, path::Path};

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

/// Suspend the TUI, open an editor at the given suite location, then restore
/// the TUI. The configured editor command wins over `$EDITOR`; both may carry
/// extra arguments.
pub fn open(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    path: PathBuf,
    line: Option<u32>,
    configured: Option<&str>,
) -> Result<()> {
    let (editor, base_args) = resolve_editor(configured);
    let mut cmd = std::process::Command::new(&editor);
    cmd.args(&base_args);
    build_args(&mut cmd, &editor, &path, line);

    terminal::disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    let result = cmd.status();

    io::stdout().execute(EnterAlternateScreen)?;
    terminal::enable_raw_mode()?;
    terminal.clear()?;

    result.map_err(|_| anyhow::anyhow!("editor '{}' not found or failed to launch", editor))?;
    Ok(())
}

fn resolve_editor(configured: Option<&str>) -> (String, Vec<String>) {
    let raw = configured
        .map(str::to_string)
        .or_else(|| std::env::var("EDITOR").ok())
        .unwrap_or_else(|| "vim".into());

    let mut words = shell_words::split(&raw).unwrap_or_default();
    if words.is_empty() {
        return ("vim".into(), Vec::new());
    }
    let program = words.remove(0);
    (program, words)
}

fn build_args(cmd: &mut std::process::Command, editor: &str, path: &Path, line: Option<u32>) {
    let path_str = path.to_string_lossy();

    match editor_kind(editor) {
        EditorKind::Vim => {
            // vim +line file
            if let Some(l) = line {
                cmd.arg(format!("+{}", l));
            }
            cmd.arg(path_str.as_ref());
        }

        EditorKind::Helix | EditorKind::Zed => {
            // hx file:line  |  zed file:line
            match line {
                Some(l) => cmd.arg(format!("{}:{}", path_str, l)),
                None => cmd.arg(path_str.as_ref()),
            };
        }

        EditorKind::VSCode => {
            // code --goto file:line
            cmd.arg("--goto");
            match line {
                Some(l) => cmd.arg(format!("{}:{}", path_str, l)),
                None => cmd.arg(path_str.as_ref()),
            };
        }

        EditorKind::WebStorm => {
            // webstorm --line <n> file
            if let Some(l) = line {
                cmd.arg("--line").arg(l.to_string());
            }
            cmd.arg(path_str.as_ref());
        }
    }
}

enum EditorKind {
    Vim,
    Helix,
    VSCode,
    WebStorm,
    Zed,
}

fn editor_kind(editor: &str) -> EditorKind {
    let bin = Path::new(editor)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(editor);

    match bin {
        "hx" | "helix" => EditorKind::Helix,
        "code" | "code-insiders" | "codium" => EditorKind::VSCode,
        "webstorm" | "wstorm" => EditorKind::WebStorm,
        "zed" => EditorKind::Zed,
        _ => EditorKind::Vim,
    }
}
