// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-sys
//!
//! Base host pass-throughs: filesystem, environment and process information.
//! Host errors are returned unchanged inside [`SysError::Io`].

pub mod env;
pub mod fs;
pub mod process;

pub use env::{env_delete, env_get, env_set, env_to_map};
pub use fs::{
    DirEntry, FileInfo, FsFile, OpenOptions, SeekMode, lstat, mkdir, open, read_dir, read_file,
    read_text_file, remove, stat, write_file, write_text_file,
};
pub use process::{args, cwd, exec_path, exit, pid};

use hc_error::{CompatError, ErrorCode};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the base surface.
#[derive(Debug, Error)]
pub enum SysError {
    /// A host call failed.
    #[error("{op}{}: {source}", quoted(.path))]
    Io {
        /// Operation name, e.g. `"read_file"`.
        op: &'static str,
        /// Path involved, if any.
        path: Option<PathBuf>,
        /// The host error.
        #[source]
        source: io::Error,
    },

    /// A seek whence outside 0 (start), 1 (current), 2 (end).
    #[error("invalid seek mode: {0}")]
    InvalidSeekMode(i32),

    /// An environment variable name the host rejects.
    #[error("invalid environment variable name: {0:?}")]
    InvalidEnvKey(String),
}

fn quoted(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" '{}'", p.display()))
        .unwrap_or_default()
}

impl SysError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: Some(path.into()),
            source,
        }
    }

    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io { source, .. } => ErrorCode::for_io(source.kind()),
            Self::InvalidSeekMode(_) => ErrorCode::ConfigInvalidSeekMode,
            Self::InvalidEnvKey(_) => ErrorCode::ConfigInvalid,
        }
    }
}

impl From<SysError> for CompatError {
    fn from(err: SysError) -> Self {
        let mut out = CompatError::new(err.code(), err.to_string());
        if let SysError::Io { op, path, .. } = &err {
            out = out.with_context("op", op);
            if let Some(path) = path {
                out = out.with_context("path", path.display().to_string());
            }
        }
        out.with_source(err)
    }
}
