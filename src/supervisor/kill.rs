use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::ProcessHandle;
use crate::debug::DebugLog;

/// Grace period between SIGTERM and the SIGKILL escalation.
const TERM_GRACE: Duration = Duration::from_millis(400);
/// Time allowed for SIGKILL to take effect before the liveness re-check.
const KILL_SETTLE: Duration = Duration::from_millis(150);

/// What a termination attempt established about the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    /// The target was signalled and is gone.
    Killed,
    /// Nothing to kill; the target was already gone.
    NotFound,
    /// This strategy could not take the target down.
    Failed,
}

/// One way of taking a child process (tree) down. Strategies run in order;
/// the first outcome other than `Failed` ends the sequence, since both
/// `Killed` and `NotFound` mean the process is gone.
#[async_trait]
pub trait KillStrategy: Send + Sync {
    async fn kill(&self, handle: &ProcessHandle, debug: &DebugLog) -> KillOutcome;

    fn name(&self) -> &'static str;
}

/// The standard sequence: signal the process group first, fall back to
/// hunting down whatever holds the service port.
pub fn default_strategies() -> Vec<Box<dyn KillStrategy>> {
    vec![Box::new(GroupSignal), Box::new(PortScan)]
}

pub async fn run_strategies(
    strategies: &[Box<dyn KillStrategy>],
    handle: &ProcessHandle,
    debug: &DebugLog,
) -> KillOutcome {
    for strategy in strategies {
        let outcome = strategy.kill(handle, debug).await;
        debug.log(&format!("[kill] {} -> {:?}", strategy.name(), outcome));
        if outcome != KillOutcome::Failed {
            return outcome;
        }
    }
    KillOutcome::Failed
}

/// SIGTERM the whole process group, then escalate to SIGKILL if the group
/// still answers a liveness probe after the grace period.
pub struct GroupSignal;

#[async_trait]
impl KillStrategy for GroupSignal {
    async fn kill(&self, handle: &ProcessHandle, _debug: &DebugLog) -> KillOutcome {
        let group = -(handle.pid as i64 as i32);
        match signal(group, Signal::Terminate) {
            SignalResult::NoSuchProcess => return KillOutcome::NotFound,
            SignalResult::Error(_) => return KillOutcome::Failed,
            SignalResult::Delivered => {}
        }
        tokio::time::sleep(TERM_GRACE).await;
        if !alive(group) {
            return KillOutcome::Killed;
        }
        let _ = signal(group, Signal::Kill);
        tokio::time::sleep(KILL_SETTLE).await;
        if alive(group) { KillOutcome::Failed } else { KillOutcome::Killed }
    }

    fn name(&self) -> &'static str {
        "group-signal"
    }
}

/// Kill whatever is listening on the service port. Covers children that
/// escaped the process group (e.g. a script that re-execs into a daemon).
pub struct PortScan;

#[async_trait]
impl KillStrategy for PortScan {
    async fn kill(&self, handle: &ProcessHandle, debug: &DebugLog) -> KillOutcome {
        let Some(port) = handle.port else {
            return KillOutcome::Failed;
        };
        free_port(port, debug).await
    }

    fn name(&self) -> &'static str {
        "port-scan"
    }
}

/// Discover and kill every process bound to `port`. `NotFound` means the
/// port was already free; also used before starting the results server so a
/// leftover listener cannot block the bind.
pub async fn free_port(port: u16, debug: &DebugLog) -> KillOutcome {
    let pids = pids_on_port(port).await;
    if pids.is_empty() {
        return KillOutcome::NotFound;
    }
    debug.log(&format!("[kill] port {} held by {:?}", port, pids));

    for pid in &pids {
        let _ = signal(*pid, Signal::Terminate);
    }
    tokio::time::sleep(TERM_GRACE).await;
    for pid in &pids {
        if alive(*pid) {
            let _ = signal(*pid, Signal::Kill);
        }
    }
    tokio::time::sleep(KILL_SETTLE).await;

    if pids.iter().any(|pid| alive(*pid)) {
        KillOutcome::Failed
    } else {
        KillOutcome::Killed
    }
}

/// PIDs listening on a TCP port, via `lsof` with a `fuser` fallback for
/// hosts that don't ship it. Either tool reporting nothing means the port
/// is free; only a missing tool falls through.
async fn pids_on_port(port: u16) -> Vec<i32> {
    let lsof = Command::new("lsof")
        .args(["-t", "-i", &format!("tcp:{port}")])
        .output()
        .await;
    match lsof {
        Ok(output) => parse_pids(&output.stdout),
        Err(_) => match Command::new("fuser").arg(format!("{port}/tcp")).output().await {
            Ok(output) => parse_pids(&output.stdout),
            Err(_) => Vec::new(),
        },
    }
}

fn parse_pids(bytes: &[u8]) -> Vec<i32> {
    String::from_utf8_lossy(bytes)
        .split_whitespace()
        .filter_map(|token| token.parse().ok())
        .collect()
}

/// Best-effort synchronous group kill, used when the panel itself is going
/// away and there is no event loop left to wait on.
pub fn kill_group(pid: u32) {
    let _ = signal(-(pid as i64 as i32), Signal::Kill);
}

enum Signal {
    Terminate,
    Kill,
}

enum SignalResult {
    Delivered,
    NoSuchProcess,
    Error(std::io::Error),
}

/// Send a signal to a pid (or, negative, a process group). "No such
/// process" is reported separately because every caller treats it as
/// already-gone rather than as a failure.
#[cfg(unix)]
fn signal(target: i32, signal: Signal) -> SignalResult {
    let sig = match signal {
        Signal::Terminate => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    if unsafe { libc::kill(target as libc::pid_t, sig) } == 0 {
        return SignalResult::Delivered;
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        SignalResult::NoSuchProcess
    } else {
        SignalResult::Error(err)
    }
}

#[cfg(not(unix))]
fn signal(_target: i32, _signal: Signal) -> SignalResult {
    SignalResult::Error(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "process signalling requires unix",
    ))
}

/// Probe with signal 0: delivery (or a permission error) means something is
/// still there.
#[cfg(unix)]
fn alive(target: i32) -> bool {
    unsafe { libc::kill(target as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn alive(_target: i32) -> bool {
    false
}
