// SPDX-License-Identifier: MIT OR Apache-2.0
//! Exit status resolution.

use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use tokio::process::Child;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Frozen result of a child's termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    /// `true` iff `code == 0` and no signal terminated the process.
    pub success: bool,
    /// Exit code; 0 when the process was terminated by a signal.
    pub code: i32,
    /// Name of the terminating signal, if any.
    pub signal: Option<String>,
}

impl ExitStatus {
    /// Build a status from a code and an optional signal name.
    pub fn new(code: i32, signal: Option<String>) -> Self {
        Self {
            success: code == 0 && signal.is_none(),
            code,
            signal,
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self::new(status.code().unwrap_or(0), terminating_signal(&status))
    }
}

#[cfg(unix)]
fn terminating_signal(status: &std::process::ExitStatus) -> Option<String> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(signal_name)
}

#[cfg(not(unix))]
fn terminating_signal(_status: &std::process::ExitStatus) -> Option<String> {
    None
}

/// Conventional name of a signal number.
pub fn signal_name(signo: i32) -> String {
    let name = match signo {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        4 => "SIGILL",
        5 => "SIGTRAP",
        6 => "SIGABRT",
        8 => "SIGFPE",
        9 => "SIGKILL",
        11 => "SIGSEGV",
        13 => "SIGPIPE",
        14 => "SIGALRM",
        15 => "SIGTERM",
        other => return platform_signal_name(other),
    };
    name.to_string()
}

#[cfg(target_os = "linux")]
fn platform_signal_name(signo: i32) -> String {
    let name = match signo {
        7 => "SIGBUS",
        10 => "SIGUSR1",
        12 => "SIGUSR2",
        17 => "SIGCHLD",
        18 => "SIGCONT",
        19 => "SIGSTOP",
        20 => "SIGTSTP",
        21 => "SIGTTIN",
        22 => "SIGTTOU",
        23 => "SIGURG",
        24 => "SIGXCPU",
        25 => "SIGXFSZ",
        26 => "SIGVTALRM",
        27 => "SIGPROF",
        28 => "SIGWINCH",
        29 => "SIGIO",
        30 => "SIGPWR",
        31 => "SIGSYS",
        other => return format!("SIG{other}"),
    };
    name.to_string()
}

#[cfg(target_os = "macos")]
fn platform_signal_name(signo: i32) -> String {
    let name = match signo {
        7 => "SIGEMT",
        10 => "SIGBUS",
        12 => "SIGSYS",
        16 => "SIGURG",
        17 => "SIGSTOP",
        18 => "SIGTSTP",
        19 => "SIGCONT",
        20 => "SIGCHLD",
        21 => "SIGTTIN",
        22 => "SIGTTOU",
        23 => "SIGIO",
        24 => "SIGXCPU",
        25 => "SIGXFSZ",
        26 => "SIGVTALRM",
        27 => "SIGPROF",
        28 => "SIGWINCH",
        29 => "SIGINFO",
        30 => "SIGUSR1",
        31 => "SIGUSR2",
        other => return format!("SIG{other}"),
    };
    name.to_string()
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn platform_signal_name(signo: i32) -> String {
    format!("SIG{signo}")
}

/// What the waiter publishes exactly once.
pub(crate) type ExitOutcome = Result<ExitStatus, Arc<io::Error>>;

/// Receiving side of the single-resolution status cell.
pub(crate) type StatusCell = watch::Receiver<Option<ExitOutcome>>;

/// Subscribe to the child's exit once and publish the frozen status.
///
/// The cell is written only after `Child::wait` returns, so stream closure
/// can never resolve it.
pub(crate) fn watch_exit(mut child: Child, program: String) -> StatusCell {
    let (tx, rx) = watch::channel(None);
    tokio::spawn(async move {
        let outcome = child.wait().await.map(ExitStatus::from).map_err(Arc::new);
        match &outcome {
            Ok(status) => debug!(
                target: "hostcompat.process",
                program = %program,
                code = status.code,
                signal = ?status.signal,
                "child exited"
            ),
            Err(e) => warn!(target: "hostcompat.process", program = %program, "wait failed: {e}"),
        }
        // Nobody listening is fine; the process is gone either way.
        let _ = tx.send(Some(outcome));
    });
    rx
}
