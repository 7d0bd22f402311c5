// SPDX-License-Identifier: MIT OR Apache-2.0
//! Information about the current process.

use crate::SysError;
use std::path::PathBuf;

pub fn pid() -> u32 {
    std::process::id()
}

pub fn cwd() -> Result<PathBuf, SysError> {
    std::env::current_dir().map_err(|source| SysError::Io {
        op: "cwd",
        path: None,
        source,
    })
}

/// Path of the running executable.
pub fn exec_path() -> Result<PathBuf, SysError> {
    std::env::current_exe().map_err(|source| SysError::Io {
        op: "exec_path",
        path: None,
        source,
    })
}

/// Command-line arguments, program name excluded.
pub fn args() -> Vec<String> {
    std::env::args_os()
        .skip(1)
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

/// Terminate the process. Destructors of live values do not run.
pub fn exit(code: i32) -> ! {
    tracing::debug!(target: "hostcompat.sys", code, "exiting");
    std::process::exit(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_current_process() {
        assert_eq!(pid(), std::process::id());
        assert!(cwd().unwrap().is_absolute());
        assert!(exec_path().unwrap().exists());
    }
}
