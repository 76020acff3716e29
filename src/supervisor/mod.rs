pub mod kill;

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;

use crate::app::AppEvent;
use crate::debug::DebugLog;
use crate::models::{ServiceKind, ServiceStatus};
use crate::runner::LaunchSpec;
use kill::KillOutcome;

/// One live child: its pid (also the process-group id, the child is spawned
/// as group leader) and the port it is expected to hold.
#[derive(Debug, Clone, Copy)]
pub struct ProcessHandle {
    pub pid: u32,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Dispatched,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Dispatched,
    NotRunning,
}

/// Tracks zero-or-one child process for a single service. Spawning,
/// streaming and killing happen in background tasks; every state change
/// comes back through the app-event channel so all mutation stays on the
/// event loop.
pub struct Supervisor {
    kind: ServiceKind,
    status: ServiceStatus,
    handle: Option<ProcessHandle>,
    events: UnboundedSender<AppEvent>,
    debug: DebugLog,
}

impl Supervisor {
    pub fn new(kind: ServiceKind, events: UnboundedSender<AppEvent>, debug: DebugLog) -> Self {
        Self { kind, status: ServiceStatus::Stopped, handle: None, events, debug }
    }

    pub fn status(&self) -> ServiceStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Dispatch a launch. Rejected while a child is active; the existing
    /// handle is left untouched so a double start can never orphan a pid.
    pub fn start(&mut self, spec: LaunchSpec) -> StartOutcome {
        if self.status.is_active() {
            return StartOutcome::AlreadyRunning;
        }
        self.status = ServiceStatus::Starting;
        tokio::spawn(launch_task(self.kind, spec, self.events.clone(), self.debug.clone()));
        StartOutcome::Dispatched
    }

    /// Dispatch termination of the current child. The handle is taken
    /// immediately, so a later exit of that pid no longer counts as "our"
    /// process.
    pub fn stop(&mut self) -> StopOutcome {
        if self.status == ServiceStatus::Stopping {
            return StopOutcome::NotRunning;
        }
        let Some(handle) = self.handle.take() else {
            return StopOutcome::NotRunning;
        };
        self.status = ServiceStatus::Stopping;
        tokio::spawn(kill_task(self.kind, handle, self.events.clone(), self.debug.clone()));
        StopOutcome::Dispatched
    }

    pub fn mark_started(&mut self, pid: u32, port: Option<u16>) {
        self.status = ServiceStatus::Running;
        self.handle = Some(ProcessHandle { pid, port });
    }

    pub fn mark_spawn_failed(&mut self) {
        self.status = ServiceStatus::Stopped;
        self.handle = None;
    }

    /// Handle a child-exit report. Returns false for a stale pid (an earlier
    /// incarnation, or one already being stopped) so the caller can ignore
    /// it without touching the current state.
    pub fn process_exited(&mut self, pid: u32) -> bool {
        if self.handle.map(|h| h.pid) != Some(pid) {
            return false;
        }
        self.status = ServiceStatus::Stopped;
        self.handle = None;
        true
    }

    pub fn mark_stopped(&mut self) {
        self.status = ServiceStatus::Stopped;
        self.handle = None;
    }

    /// Synchronous best-effort group kill for host shutdown, when no event
    /// loop remains to run the strategy sequence.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.debug
                .log(&format!("[{}] shutdown kill of group {}", self.kind.label(), handle.pid));
            kill::kill_group(handle.pid);
        }
        self.status = ServiceStatus::Stopped;
    }
}

/// Guard that kills the child's entire process group on drop, so a dropped
/// launch task (panel closed mid-run) cannot leak the script's children.
struct ChildGuard {
    child: Option<tokio::process::Child>,
    /// Process group ID saved at spawn time so we can kill the whole group.
    #[cfg(unix)]
    pgid: Option<u32>,
}

impl ChildGuard {
    fn new(child: tokio::process::Child) -> Self {
        #[cfg(unix)]
        let pgid = child.id();
        Self {
            child: Some(child),
            #[cfg(unix)]
            pgid,
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pgid) = self.pgid {
            unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) };
        }
        // Fallback / non-Unix: kill just the direct child.
        if let Some(ref mut child) = self.child {
            let _ = child.start_kill();
        }
    }
}

/// Clear the target port if needed, spawn the child as a process-group
/// leader with piped stdio, and stream its output until exit. Every state
/// change is reported as an event; this task never touches the supervisor
/// directly.
async fn launch_task(
    kind: ServiceKind,
    spec: LaunchSpec,
    events: UnboundedSender<AppEvent>,
    debug: DebugLog,
) {
    if let Some(port) = spec.port {
        match kill::free_port(port, &debug).await {
            KillOutcome::NotFound => {}
            KillOutcome::Killed => {
                let _ = events.send(AppEvent::Output {
                    kind,
                    line: format!("cleared a leftover listener on port {port}"),
                });
            }
            KillOutcome::Failed => {
                let _ = events.send(AppEvent::SpawnFailed {
                    kind,
                    message: format!("port {port} is in use and could not be cleared"),
                });
                return;
            }
        }
    }

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);

    // Put the child in its own process group so killing it also takes out
    // whatever the script forks (prevents orphans).
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.as_std_mut().process_group(0);
    }

    debug.log(&format!("[{}] spawning {:?}", kind.label(), cmd.as_std()));

    let mut child = match cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            let _ = events.send(AppEvent::SpawnFailed {
                kind,
                message: format!("failed to spawn {}: {e}", spec.program),
            });
            return;
        }
    };

    let Some(pid) = child.id() else {
        let _ = events.send(AppEvent::SpawnFailed {
            kind,
            message: "child exited before it could be tracked".to_string(),
        });
        return;
    };
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let _ = events.send(AppEvent::ServiceStarted { kind, pid, port: spec.port });

    // The child stays in the guard at all times so it is always killed if
    // this future is dropped mid-stream.
    let mut guard = ChildGuard::new(child);

    let stderr_handle = stderr.map(|stderr| {
        let events = events.clone();
        let debug = debug.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug.log(&format!("[{}][stderr] {}", kind.label(), line));
                let _ = events.send(AppEvent::Output { kind, line });
            }
        })
    });

    if let Some(stdout) = stdout {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let _ = events.send(AppEvent::Output { kind, line });
        }
    }

    if let Some(handle) = stderr_handle {
        handle.await.ok();
    }

    let code = match guard.child.as_mut() {
        Some(child) => child.wait().await.ok().and_then(|status| status.code()),
        None => None,
    };
    debug.log(&format!("[{}] pid {} exited with {:?}", kind.label(), pid, code));
    let _ = events.send(AppEvent::ServiceExited { kind, pid, code });
}

/// Run the termination strategies against a taken handle and report the
/// result. The service always ends up stopped; an error is attached only
/// when every strategy failed.
async fn kill_task(
    kind: ServiceKind,
    handle: ProcessHandle,
    events: UnboundedSender<AppEvent>,
    debug: DebugLog,
) {
    let strategies = kill::default_strategies();
    let outcome = kill::run_strategies(&strategies, &handle, &debug).await;
    let error = match outcome {
        KillOutcome::Failed => {
            Some(format!("could not confirm pid {} gone; it may still be running", handle.pid))
        }
        _ => None,
    };
    let _ = events.send(AppEvent::ServiceStopped { kind, error });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn supervisor(kind: ServiceKind) -> (Supervisor, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Supervisor::new(kind, tx, DebugLog::disabled()), rx)
    }

    fn missing_binary_spec() -> LaunchSpec {
        LaunchSpec {
            program: "gantry-test-binary-that-does-not-exist".to_string(),
            args: vec![],
            port: None,
        }
    }

    #[tokio::test]
    async fn stop_before_any_start_is_rejected_silently() {
        let (mut sup, mut rx) = supervisor(ServiceKind::ResultsServer);
        assert_eq!(sup.stop(), StopOutcome::NotRunning);
        assert_eq!(sup.status(), ServiceStatus::Stopped);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn second_start_is_rejected_while_active() {
        let (mut sup, mut rx) = supervisor(ServiceKind::TestRun);
        assert_eq!(sup.start(missing_binary_spec()), StartOutcome::Dispatched);
        assert_eq!(sup.status(), ServiceStatus::Starting);
        assert_eq!(sup.start(missing_binary_spec()), StartOutcome::AlreadyRunning);

        match rx.recv().await {
            Some(AppEvent::SpawnFailed { kind, .. }) => assert_eq!(kind, ServiceKind::TestRun),
            other => panic!("expected SpawnFailed, got {other:?}"),
        }
        sup.mark_spawn_failed();
        assert_eq!(sup.status(), ServiceStatus::Stopped);
        assert_eq!(sup.start(missing_binary_spec()), StartOutcome::Dispatched);
    }

    #[tokio::test]
    async fn exit_reports_are_guarded_by_pid() {
        let (mut sup, _rx) = supervisor(ServiceKind::ResultsServer);
        sup.mark_started(42, Some(8000));
        assert_eq!(sup.status(), ServiceStatus::Running);

        assert!(!sup.process_exited(7));
        assert_eq!(sup.status(), ServiceStatus::Running);

        assert!(sup.process_exited(42));
        assert_eq!(sup.status(), ServiceStatus::Stopped);
    }

    #[tokio::test]
    async fn exit_during_stop_is_stale() {
        let (mut sup, _rx) = supervisor(ServiceKind::TestRun);
        sup.mark_started(42, None);
        assert_eq!(sup.stop(), StopOutcome::Dispatched);
        assert_eq!(sup.status(), ServiceStatus::Stopping);

        // The handle was taken by stop; the exit report must not disturb it.
        assert!(!sup.process_exited(42));
        assert_eq!(sup.status(), ServiceStatus::Stopping);

        sup.mark_stopped();
        assert_eq!(sup.status(), ServiceStatus::Stopped);
    }

    #[tokio::test]
    async fn double_stop_is_rejected() {
        let (mut sup, _rx) = supervisor(ServiceKind::TestRun);
        sup.mark_started(42, None);
        assert_eq!(sup.stop(), StopOutcome::Dispatched);
        assert_eq!(sup.stop(), StopOutcome::NotRunning);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_terminates_a_running_group() {
        let (mut sup, mut rx) = supervisor(ServiceKind::TestRun);

        let mut cmd = Command::new("sleep");
        cmd.arg("30").kill_on_drop(true);
        {
            use std::os::unix::process::CommandExt;
            cmd.as_std_mut().process_group(0);
        }
        let mut child = cmd.spawn().unwrap();
        let pid = child.id().unwrap();
        // Reap in the background, as the launch task would; an unreaped
        // zombie still answers the liveness probe.
        tokio::spawn(async move {
            let _ = child.wait().await;
        });

        sup.mark_started(pid, None);
        assert_eq!(sup.stop(), StopOutcome::Dispatched);
        assert_eq!(sup.status(), ServiceStatus::Stopping);

        match rx.recv().await {
            Some(AppEvent::ServiceStopped { error, .. }) => assert!(error.is_none()),
            other => panic!("expected ServiceStopped, got {other:?}"),
        }
        sup.mark_stopped();
        assert!(!sup.is_active());
    }
}
