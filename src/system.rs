// SPDX-License-Identifier: MIT OR Apache-2.0
//! Base system surface.

use async_trait::async_trait;
use hc_process::{Command, CommandOptions};
use hc_sys::{DirEntry, FileInfo, FsFile, OpenOptions, SysError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Filesystem, environment, process information and subprocesses.
#[async_trait]
pub trait SystemApi: Send + Sync {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, SysError>;
    async fn read_text_file(&self, path: &Path) -> Result<String, SysError>;
    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), SysError>;
    async fn write_text_file(&self, path: &Path, text: &str) -> Result<(), SysError>;
    async fn stat(&self, path: &Path) -> Result<FileInfo, SysError>;
    async fn lstat(&self, path: &Path) -> Result<FileInfo, SysError>;
    /// Entries sorted by name.
    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, SysError>;
    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<(), SysError>;
    async fn remove(&self, path: &Path, recursive: bool) -> Result<(), SysError>;
    async fn open(&self, path: &Path, options: OpenOptions) -> Result<FsFile, SysError>;

    fn env_get(&self, key: &str) -> Option<String>;
    /// # Safety
    ///
    /// See [`hc_sys::env_set`].
    unsafe fn env_set(&self, key: &str, value: &str) -> Result<(), SysError>;
    /// # Safety
    ///
    /// See [`hc_sys::env_delete`].
    unsafe fn env_delete(&self, key: &str) -> Result<(), SysError>;
    fn env_to_map(&self) -> BTreeMap<String, String>;

    fn pid(&self) -> u32;
    fn cwd(&self) -> Result<PathBuf, SysError>;
    fn exec_path(&self) -> Result<PathBuf, SysError>;
    fn args(&self) -> Vec<String>;
    fn exit(&self, code: i32) -> !;

    /// Describe a subprocess. Nothing runs until `spawn` or `output`.
    fn command(&self, program: &str, options: CommandOptions) -> Command;
}

/// [`SystemApi`] backed by the host's own primitives.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostSystem;

#[async_trait]
impl SystemApi for HostSystem {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, SysError> {
        hc_sys::read_file(path).await
    }

    async fn read_text_file(&self, path: &Path) -> Result<String, SysError> {
        hc_sys::read_text_file(path).await
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), SysError> {
        hc_sys::write_file(path, data).await
    }

    async fn write_text_file(&self, path: &Path, text: &str) -> Result<(), SysError> {
        hc_sys::write_text_file(path, text).await
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo, SysError> {
        hc_sys::stat(path).await
    }

    async fn lstat(&self, path: &Path) -> Result<FileInfo, SysError> {
        hc_sys::lstat(path).await
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, SysError> {
        hc_sys::read_dir(path).await
    }

    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<(), SysError> {
        hc_sys::mkdir(path, recursive).await
    }

    async fn remove(&self, path: &Path, recursive: bool) -> Result<(), SysError> {
        hc_sys::remove(path, recursive).await
    }

    async fn open(&self, path: &Path, options: OpenOptions) -> Result<FsFile, SysError> {
        hc_sys::open(path, options).await
    }

    fn env_get(&self, key: &str) -> Option<String> {
        hc_sys::env_get(key)
    }

    unsafe fn env_set(&self, key: &str, value: &str) -> Result<(), SysError> {
        unsafe { hc_sys::env_set(key, value) }
    }

    unsafe fn env_delete(&self, key: &str) -> Result<(), SysError> {
        unsafe { hc_sys::env_delete(key) }
    }

    fn env_to_map(&self) -> BTreeMap<String, String> {
        hc_sys::env_to_map()
    }

    fn pid(&self) -> u32 {
        hc_sys::pid()
    }

    fn cwd(&self) -> Result<PathBuf, SysError> {
        hc_sys::cwd()
    }

    fn exec_path(&self) -> Result<PathBuf, SysError> {
        hc_sys::exec_path()
    }

    fn args(&self) -> Vec<String> {
        hc_sys::args()
    }

    fn exit(&self, code: i32) -> ! {
        hc_sys::exit(code)
    }

    fn command(&self, program: &str, options: CommandOptions) -> Command {
        Command::new(program, options)
    }
}
