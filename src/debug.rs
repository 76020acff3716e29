use std::fs::File;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Debug log sink, enabled by pointing `GANTRY_DEBUG` at a file path.
///
/// The TUI owns the terminal, so diagnostics that would normally go to
/// stderr are appended here instead. When the variable is unset every
/// `log` call is a no-op.
#[derive(Clone, Default)]
pub struct DebugLog {
    file: Option<Arc<Mutex<File>>>,
}

impl DebugLog {
    pub fn from_env() -> Self {
        let file = std::env::var("GANTRY_DEBUG").ok().and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .ok()
                .map(|f| Arc::new(Mutex::new(f)))
        });
        Self { file }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self { file: None }
    }

    pub fn log(&self, msg: &str) {
        if let Some(ref file) = self.file
            && let Ok(mut f) = file.lock()
        {
            let _ = writeln!(f, "{}", msg);
        }
    }
}
