// SPDX-License-Identifier: MIT OR Apache-2.0
//! Live handle to a launched child and its streams.

use crate::status::StatusCell;
use crate::{CommandOutput, ExitStatus, ProcessError};
use futures::{Stream, TryStreamExt};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout};
use tracing::{debug, trace};

const CHUNK_SIZE: usize = 8 * 1024;

/// Read `reader` to EOF as a stream of non-empty chunks.
pub fn chunk_stream<R>(reader: R) -> impl Stream<Item = io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    futures::stream::try_unfold(reader, |mut reader| async move {
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok::<_, io::Error>(None);
        }
        chunk.truncate(n);
        Ok(Some((chunk, reader)))
    })
}

async fn drain<R>(reader: Option<R>) -> Result<Vec<u8>, ProcessError>
where
    R: AsyncRead + Unpin,
{
    match reader {
        Some(r) => chunk_stream(r).try_concat().await.map_err(ProcessError::Stdout),
        None => Ok(Vec::new()),
    }
}

/// Piped stdin of a child. Hands out a [`StdinWriter`].
#[derive(Debug)]
pub struct ChildStdinStream {
    pipe: Option<ChildStdin>,
}

impl ChildStdinStream {
    pub(crate) fn new(pipe: ChildStdin) -> Self {
        Self { pipe: Some(pipe) }
    }

    /// Acquire the writer. The borrow is the lock.
    pub fn writer(&mut self) -> StdinWriter<'_> {
        StdinWriter { stream: self }
    }

    /// `true` once the write side has been half-closed.
    pub fn is_closed(&self) -> bool {
        self.pipe.is_none()
    }
}

/// Writer over a child's stdin.
///
/// Writes complete in submission order: each call returns only after the
/// bytes were flushed into the OS pipe.
#[derive(Debug)]
pub struct StdinWriter<'a> {
    stream: &'a mut ChildStdinStream,
}

impl StdinWriter<'_> {
    /// Write all of `bytes` and flush them to the pipe.
    ///
    /// Fails with [`ProcessError::StdinClosed`] after [`close`](Self::close),
    /// and with [`ProcessError::Stdin`] when the child has gone away. Either
    /// failure only affects this call.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<usize, ProcessError> {
        let pipe = self
            .stream
            .pipe
            .as_mut()
            .ok_or(ProcessError::StdinClosed)?;
        pipe.write_all(bytes).await.map_err(ProcessError::Stdin)?;
        pipe.flush().await.map_err(ProcessError::Stdin)?;
        trace!(target: "hostcompat.process", len = bytes.len(), "stdin write acknowledged");
        Ok(bytes.len())
    }

    /// Half-close the write side. Returns once the shutdown has completed.
    pub async fn close(&mut self) -> Result<(), ProcessError> {
        let mut pipe = self.stream.pipe.take().ok_or(ProcessError::StdinClosed)?;
        pipe.shutdown().await.map_err(ProcessError::Stdin)?;
        drop(pipe);
        debug!(target: "hostcompat.process", "stdin closed");
        Ok(())
    }

    /// Release the writer. There is no lock to drop besides the borrow.
    pub fn release_lock(self) {}
}

/// A launched child process.
///
/// The exit status is published once by a background waiter and can be
/// awaited any number of times. Dropping this handle does not kill the child.
#[derive(Debug)]
pub struct SpawnedProcess {
    pid: Option<u32>,
    stdin: Option<ChildStdinStream>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    status: StatusCell,
}

impl SpawnedProcess {
    pub(crate) fn new(
        pid: Option<u32>,
        stdin: Option<ChildStdin>,
        stdout: Option<ChildStdout>,
        stderr: Option<ChildStderr>,
        status: StatusCell,
    ) -> Self {
        Self {
            pid,
            stdin: stdin.map(ChildStdinStream::new),
            stdout,
            stderr,
            status,
        }
    }

    /// OS process id, if the child had not already been reaped.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Piped stdin, or `None` when stdin was not `piped`.
    pub fn stdin(&mut self) -> Option<&mut ChildStdinStream> {
        self.stdin.as_mut()
    }

    /// Take ownership of the piped stdin.
    pub fn take_stdin(&mut self) -> Option<ChildStdinStream> {
        self.stdin.take()
    }

    /// Take the raw stdout handle. Later stdout reads see nothing.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Take the raw stderr handle.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Resolve the exit status.
    ///
    /// Resolves only after the OS reports termination, never on stream
    /// closure. Every call yields the same value.
    pub async fn status(&self) -> Result<ExitStatus, ProcessError> {
        let mut rx = self.status.clone();
        let outcome = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ProcessError::StatusLost)?;
        match &*outcome {
            Some(Ok(status)) => Ok(status.clone()),
            Some(Err(e)) => Err(ProcessError::Wait(e.clone())),
            None => Err(ProcessError::StatusLost),
        }
    }

    /// Drain the remaining stdout into one contiguous buffer.
    ///
    /// Empty when stdout was not piped or was already taken.
    pub async fn read_stdout(&mut self) -> Result<Vec<u8>, ProcessError> {
        drain(self.stdout.take()).await
    }

    /// Await both the stdout drain and the exit status.
    ///
    /// An unclosed stdin is dropped first so the child sees EOF. A piped
    /// stderr is read and discarded to keep the child from blocking on a
    /// full pipe; it is not captured (`stderr` in the result is empty).
    pub async fn output(mut self) -> Result<CommandOutput, ProcessError> {
        drop(self.stdin.take());
        let stdout = self.stdout.take();
        let stderr = self.stderr.take();

        let discard_stderr = async move {
            if let Some(stderr) = stderr {
                match drain(Some(stderr)).await {
                    Ok(bytes) => trace!(
                        target: "hostcompat.process",
                        len = bytes.len(),
                        "discarded stderr"
                    ),
                    Err(e) => debug!(target: "hostcompat.process", "stderr drain failed: {e}"),
                }
            }
            Ok::<(), ProcessError>(())
        };

        let (bytes, status, ()) =
            tokio::try_join!(drain(stdout), self.status(), discard_stderr)?;
        Ok(CommandOutput::new(status, bytes))
    }
}
