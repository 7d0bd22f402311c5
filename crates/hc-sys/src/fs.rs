// SPDX-License-Identifier: MIT OR Apache-2.0
//! Filesystem pass-throughs over `tokio::fs`.

use crate::SysError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::trace;

/// Metadata of one filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub is_file: bool,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub size: u64,
    /// Last modification time, when the platform reports one.
    pub mtime: Option<DateTime<Utc>>,
}

impl From<std::fs::Metadata> for FileInfo {
    fn from(meta: std::fs::Metadata) -> Self {
        Self {
            is_file: meta.is_file(),
            is_dir: meta.is_dir(),
            is_symlink: meta.file_type().is_symlink(),
            size: meta.len(),
            mtime: meta.modified().ok().map(DateTime::<Utc>::from),
        }
    }
}

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub is_file: bool,
    pub is_dir: bool,
    pub is_symlink: bool,
}

pub async fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>, SysError> {
    let path = path.as_ref();
    fs::read(path)
        .await
        .map_err(|e| SysError::io("read_file", path, e))
}

/// Read a file as UTF-8. Invalid data is an `InvalidData` host error.
pub async fn read_text_file(path: impl AsRef<Path>) -> Result<String, SysError> {
    let path = path.as_ref();
    fs::read_to_string(path)
        .await
        .map_err(|e| SysError::io("read_text_file", path, e))
}

pub async fn write_file(path: impl AsRef<Path>, data: &[u8]) -> Result<(), SysError> {
    let path = path.as_ref();
    fs::write(path, data)
        .await
        .map_err(|e| SysError::io("write_file", path, e))
}

pub async fn write_text_file(path: impl AsRef<Path>, text: &str) -> Result<(), SysError> {
    let path = path.as_ref();
    fs::write(path, text.as_bytes())
        .await
        .map_err(|e| SysError::io("write_text_file", path, e))
}

/// Metadata, following symlinks.
pub async fn stat(path: impl AsRef<Path>) -> Result<FileInfo, SysError> {
    let path = path.as_ref();
    fs::metadata(path)
        .await
        .map(FileInfo::from)
        .map_err(|e| SysError::io("stat", path, e))
}

/// Metadata of the link itself.
pub async fn lstat(path: impl AsRef<Path>) -> Result<FileInfo, SysError> {
    let path = path.as_ref();
    fs::symlink_metadata(path)
        .await
        .map(FileInfo::from)
        .map_err(|e| SysError::io("lstat", path, e))
}

/// Entries of `path`, sorted by name.
pub async fn read_dir(path: impl AsRef<Path>) -> Result<Vec<DirEntry>, SysError> {
    let path = path.as_ref();
    let err = |e| SysError::io("read_dir", path, e);
    let mut entries = fs::read_dir(path).await.map_err(err)?;
    let mut out = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(err)? {
        let ty = entry.file_type().await.map_err(err)?;
        out.push(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_file: ty.is_file(),
            is_dir: ty.is_dir(),
            is_symlink: ty.is_symlink(),
        });
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

/// Create a directory, with parents when `recursive`.
pub async fn mkdir(path: impl AsRef<Path>, recursive: bool) -> Result<(), SysError> {
    let path = path.as_ref();
    let result = if recursive {
        fs::create_dir_all(path).await
    } else {
        fs::create_dir(path).await
    };
    result.map_err(|e| SysError::io("mkdir", path, e))
}

/// Remove a file or directory. Non-empty directories need `recursive`.
pub async fn remove(path: impl AsRef<Path>, recursive: bool) -> Result<(), SysError> {
    let path = path.as_ref();
    let err = |e| SysError::io("remove", path, e);
    let meta = fs::symlink_metadata(path).await.map_err(err)?;
    let result = if !meta.is_dir() {
        fs::remove_file(path).await
    } else if recursive {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_dir(path).await
    };
    result.map_err(err)
}

/// Whence for [`FsFile::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekMode {
    Start,
    Current,
    End,
}

impl TryFrom<i32> for SeekMode {
    type Error = SysError;

    fn try_from(whence: i32) -> Result<Self, Self::Error> {
        match whence {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            other => Err(SysError::InvalidSeekMode(other)),
        }
    }
}

/// How [`open`] opens a file. Defaults to read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
    pub create_new: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            read: true,
            write: false,
            append: false,
            truncate: false,
            create: false,
            create_new: false,
        }
    }
}

impl OpenOptions {
    /// Read and write, creating the file if missing.
    pub fn read_write() -> Self {
        Self {
            write: true,
            create: true,
            ..Self::default()
        }
    }

    fn to_host(self) -> fs::OpenOptions {
        let mut o = fs::OpenOptions::new();
        o.read(self.read)
            .write(self.write)
            .append(self.append)
            .truncate(self.truncate)
            .create(self.create)
            .create_new(self.create_new);
        o
    }
}

/// An open file handle.
#[derive(Debug)]
pub struct FsFile {
    path: PathBuf,
    file: fs::File,
}

/// Open `path` with `options`.
pub async fn open(path: impl AsRef<Path>, options: OpenOptions) -> Result<FsFile, SysError> {
    let path = path.as_ref();
    let file = options
        .to_host()
        .open(path)
        .await
        .map_err(|e| SysError::io("open", path, e))?;
    trace!(target: "hostcompat.sys", path = %path.display(), "file opened");
    Ok(FsFile {
        path: path.to_path_buf(),
        file,
    })
}

impl FsFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read into `buf`. Returns 0 at end of file.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SysError> {
        self.file
            .read(buf)
            .await
            .map_err(|e| SysError::io("read", &self.path, e))
    }

    /// Write from `buf`. May write fewer bytes than given.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize, SysError> {
        self.file
            .write(buf)
            .await
            .map_err(|e| SysError::io("write", &self.path, e))
    }

    /// Move the cursor. `whence` is 0 (start), 1 (current) or 2 (end); any
    /// other value fails before touching the file.
    pub async fn seek(&mut self, offset: i64, whence: i32) -> Result<u64, SysError> {
        let target = match SeekMode::try_from(whence)? {
            SeekMode::Start => SeekFrom::Start(u64::try_from(offset).map_err(|_| {
                SysError::io(
                    "seek",
                    &self.path,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "negative offset from start",
                    ),
                )
            })?),
            SeekMode::Current => SeekFrom::Current(offset),
            SeekMode::End => SeekFrom::End(offset),
        };
        self.file
            .seek(target)
            .await
            .map_err(|e| SysError::io("seek", &self.path, e))
    }

    /// Flush pending writes and release the handle.
    pub async fn close(mut self) -> Result<(), SysError> {
        self.file
            .flush()
            .await
            .map_err(|e| SysError::io("close", &self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_mode_accepts_only_known_values() {
        assert_eq!(SeekMode::try_from(0).unwrap(), SeekMode::Start);
        assert_eq!(SeekMode::try_from(2).unwrap(), SeekMode::End);
        for bad in [-1, 3, 42] {
            assert!(matches!(
                SeekMode::try_from(bad),
                Err(SysError::InvalidSeekMode(v)) if v == bad
            ));
        }
    }

    #[test]
    fn open_options_default_to_read_only() {
        let o = OpenOptions::default();
        assert!(o.read && !o.write && !o.create);
        let o: OpenOptions = serde_json::from_str(r#"{"write":true}"#).unwrap();
        assert!(o.read && o.write);
    }
}
