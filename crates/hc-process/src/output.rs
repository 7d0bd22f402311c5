// SPDX-License-Identifier: MIT OR Apache-2.0
//! Combined result of the output convenience path.

use crate::ExitStatus;
use serde::{Deserialize, Serialize};

/// Exit status plus collected stdout.
///
/// Known limitation: `stderr` is always empty here, even when stderr was
/// piped. Take the raw handle with
/// [`SpawnedProcess::take_stderr`](crate::SpawnedProcess::take_stderr) to
/// read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// `true` iff `code == 0` and no signal.
    pub success: bool,
    /// Exit code (0 when signal-terminated).
    pub code: i32,
    /// Terminating signal name.
    pub signal: Option<String>,
    /// Everything the child wrote to stdout, in order.
    pub stdout: Vec<u8>,
    /// Always empty.
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub(crate) fn new(status: ExitStatus, stdout: Vec<u8>) -> Self {
        Self {
            success: status.success,
            code: status.code,
            signal: status.signal,
            stdout,
            stderr: Vec::new(),
        }
    }

    /// The exit status part.
    pub fn status(&self) -> ExitStatus {
        ExitStatus {
            success: self.success,
            code: self.code,
            signal: self.signal.clone(),
        }
    }

    /// Stdout decoded as UTF-8, replacing invalid sequences.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}
