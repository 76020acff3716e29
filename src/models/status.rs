use ratatui::style::Color;

use crate::ui::theme;

/// The two processes the panel manages, each with its own supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    ResultsServer,
    TestRun,
}

impl ServiceKind {
    pub fn label(&self) -> &'static str {
        match self {
            ServiceKind::ResultsServer => "results server",
            ServiceKind::TestRun => "test run",
        }
    }
}

/// Lifecycle of a managed process. Created `Stopped`; `Starting` while the
/// launch task runs; `Running` after a successful spawn; `Stopping` while
/// termination is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl ServiceStatus {
    /// Anything but `Stopped` holds the service slot; a new start is
    /// rejected until the slot frees up again.
    pub fn is_active(&self) -> bool {
        !matches!(self, ServiceStatus::Stopped)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ServiceStatus::Stopped => "○",
            ServiceStatus::Starting => "◌",
            ServiceStatus::Running => "●",
            ServiceStatus::Stopping => "◍",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            ServiceStatus::Stopped => theme::OVERLAY0,
            ServiceStatus::Starting => theme::YELLOW,
            ServiceStatus::Running => theme::GREEN,
            ServiceStatus::Stopping => theme::PEACH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_stopped_is_inactive() {
        assert!(!ServiceStatus::Stopped.is_active());
        assert!(ServiceStatus::Starting.is_active());
        assert!(ServiceStatus::Running.is_active());
        assert!(ServiceStatus::Stopping.is_active());
    }
}
