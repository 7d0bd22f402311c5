// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-process
//!
//! Subprocess command adapter. A [`Command`] is an immutable launch
//! description; [`Command::spawn`] launches synchronously and hands back a
//! [`SpawnedProcess`] whose I/O and exit status are asynchronous.
//!
//! ```no_run
//! use hc_process::{Command, CommandOptions, StdioMode};
//!
//! # async fn demo() -> Result<(), hc_process::ProcessError> {
//! let out = Command::new(
//!     "echo",
//!     CommandOptions::default().arg("hello").stdout(StdioMode::Piped),
//! )
//! .output()
//! .await?;
//! assert_eq!(out.stdout, b"hello\n");
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod output;
mod spawned;
mod status;
mod stdio;

pub use command::{Command, CommandOptions, merged_env};
pub use output::CommandOutput;
pub use spawned::{ChildStdinStream, SpawnedProcess, StdinWriter, chunk_stream};
pub use status::{ExitStatus, signal_name};
pub use stdio::StdioMode;

use hc_error::{CompatError, ErrorCode};
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Errors from launching a child or operating on its streams.
///
/// Host errors are carried unchanged as the source.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The host refused to launch the program.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that was launched.
        program: String,
        /// Error reported by the host.
        #[source]
        source: io::Error,
    },

    /// A stdin write or close failed.
    #[error("failed to write child stdin: {0}")]
    Stdin(#[source] io::Error),

    /// Write or close issued after the writer was closed.
    #[error("child stdin is closed")]
    StdinClosed,

    /// Draining stdout failed.
    #[error("failed to read child stdout: {0}")]
    Stdout(#[source] io::Error),

    /// Waiting on the OS process failed.
    #[error("failed to wait for child: {0}")]
    Wait(#[source] Arc<io::Error>),

    /// The waiter went away without publishing a status.
    #[error("exit status was never reported")]
    StatusLost,
}

impl ProcessError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Spawn { source, .. } => ErrorCode::for_launch(source.kind()),
            Self::Stdin(e) | Self::Stdout(e) => ErrorCode::for_io(e.kind()),
            Self::StdinClosed => ErrorCode::IoWriteAfterClose,
            Self::Wait(e) => ErrorCode::for_io(e.kind()),
            Self::StatusLost => ErrorCode::Internal,
        }
    }
}

impl From<ProcessError> for CompatError {
    fn from(err: ProcessError) -> Self {
        let mut out = CompatError::new(err.code(), err.to_string());
        if let ProcessError::Spawn { program, .. } = &err {
            out = out.with_context("program", program);
        }
        out.with_source(err)
    }
}
