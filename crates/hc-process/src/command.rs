// SPDX-License-Identifier: MIT OR Apache-2.0
//! Immutable launch description and synchronous spawn.

use crate::status::watch_exit;
use crate::{CommandOutput, ProcessError, SpawnedProcess, StdioMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Options recognised by [`Command::new`].
///
/// Field names and stdio values match the declarative surface, so a JSON
/// object like `{"args": ["-n"], "stdout": "piped"}` deserialises directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandOptions {
    /// Ordered argument list.
    pub args: Vec<String>,
    /// Working directory for the child.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Variables applied over a full copy of the current environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    /// Stdin wiring.
    pub stdin: StdioMode,
    /// Stdout wiring.
    pub stdout: StdioMode,
    /// Stderr wiring.
    pub stderr: StdioMode,
}

impl CommandOptions {
    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add one environment override.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set stdin wiring.
    pub fn stdin(mut self, mode: StdioMode) -> Self {
        self.stdin = mode;
        self
    }

    /// Set stdout wiring.
    pub fn stdout(mut self, mode: StdioMode) -> Self {
        self.stdout = mode;
        self
    }

    /// Set stderr wiring.
    pub fn stderr(mut self, mode: StdioMode) -> Self {
        self.stderr = mode;
        self
    }
}

/// Full copy of the current environment with `overrides` applied on top.
///
/// The child never sees a wholesale replacement; variables such as `PATH`
/// survive unless explicitly overridden.
pub fn merged_env(overrides: &BTreeMap<String, String>) -> BTreeMap<OsString, OsString> {
    let mut env: BTreeMap<OsString, OsString> = std::env::vars_os().collect();
    for (k, v) in overrides {
        env.insert(OsString::from(k), OsString::from(v));
    }
    env
}

/// A subprocess launch description. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: String,
    options: CommandOptions,
}

impl Command {
    /// Describe a launch of `program` with `options`.
    pub fn new(program: impl Into<String>, options: CommandOptions) -> Self {
        Self {
            program: program.into(),
            options,
        }
    }

    /// Executable path or name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Argument list.
    pub fn args(&self) -> &[String] {
        &self.options.args
    }

    /// Working directory, if any.
    pub fn cwd(&self) -> Option<&Path> {
        self.options.cwd.as_deref()
    }

    /// The options this command was built with.
    pub fn options(&self) -> &CommandOptions {
        &self.options
    }

    fn to_host_command(&self) -> tokio::process::Command {
        let opts = &self.options;
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&opts.args)
            .stdin(opts.stdin.to_stdio())
            .stdout(opts.stdout.to_stdio())
            .stderr(opts.stderr.to_stdio());

        if let Some(cwd) = &opts.cwd {
            cmd.current_dir(cwd);
        }

        if let Some(overrides) = &opts.env {
            cmd.env_clear();
            cmd.envs(merged_env(overrides));
        }

        cmd
    }

    /// Launch the child.
    ///
    /// The OS launch is synchronous, so a missing or non-executable program
    /// fails here, before any exit-status cell exists. Must be called from
    /// within a tokio runtime.
    pub fn spawn(&self) -> Result<SpawnedProcess, ProcessError> {
        let mut child = self.to_host_command().spawn().map_err(|source| {
            warn!(target: "hostcompat.process", program = %self.program, "spawn failed: {source}");
            ProcessError::Spawn {
                program: self.program.clone(),
                source,
            }
        })?;

        let pid = child.id();
        debug!(
            target: "hostcompat.process",
            program = %self.program,
            pid = ?pid,
            stdin = %self.options.stdin,
            stdout = %self.options.stdout,
            stderr = %self.options.stderr,
            "spawned"
        );

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let status = watch_exit(child, self.program.clone());

        Ok(SpawnedProcess::new(pid, stdin, stdout, stderr, status))
    }

    /// Spawn, then collect stdout and the exit status.
    ///
    /// `stderr` in the result is always empty; see [`CommandOutput`].
    pub async fn output(&self) -> Result<CommandOutput, ProcessError> {
        self.spawn()?.output().await
    }
}
