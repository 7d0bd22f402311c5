// SPDX-License-Identifier: MIT OR Apache-2.0
//! Filesystem pass-throughs against a temporary directory.

use hc_error::ErrorCode;
use hc_sys::{OpenOptions, SysError};

#[tokio::test]
async fn text_and_bytes_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let text = dir.path().join("a.txt");
    let bin = dir.path().join("b.bin");

    hc_sys::write_text_file(&text, "héllo").await.unwrap();
    hc_sys::write_file(&bin, &[0, 159, 146, 150]).await.unwrap();

    assert_eq!(hc_sys::read_text_file(&text).await.unwrap(), "héllo");
    assert_eq!(hc_sys::read_file(&bin).await.unwrap(), vec![0, 159, 146, 150]);

    let err = hc_sys::read_text_file(&bin).await.unwrap_err();
    match err {
        SysError::Io { op, ref source, .. } => {
            assert_eq!(op, "read_text_file");
            assert_eq!(source.kind(), std::io::ErrorKind::InvalidData);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn missing_file_passes_host_error_through() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let err = hc_sys::read_file(&missing).await.unwrap_err();
    match &err {
        SysError::Io { path, source, .. } => {
            assert_eq!(path.as_deref(), Some(missing.as_path()));
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(err.code(), ErrorCode::IoFailed);
    assert!(err.to_string().contains("read_file"));
}

#[tokio::test]
async fn stat_and_read_dir() {
    let dir = tempfile::tempdir().unwrap();
    hc_sys::write_text_file(dir.path().join("z.txt"), "zz").await.unwrap();
    hc_sys::write_text_file(dir.path().join("a.txt"), "a").await.unwrap();
    hc_sys::mkdir(dir.path().join("m/n"), true).await.unwrap();

    let info = hc_sys::stat(dir.path().join("z.txt")).await.unwrap();
    assert!(info.is_file && !info.is_dir);
    assert_eq!(info.size, 2);
    assert!(info.mtime.is_some());

    let names: Vec<_> = hc_sys::read_dir(dir.path())
        .await
        .unwrap()
        .into_iter()
        .map(|e| (e.name, e.is_dir))
        .collect();
    assert_eq!(
        names,
        vec![
            ("a.txt".to_string(), false),
            ("m".to_string(), true),
            ("z.txt".to_string(), false)
        ]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn lstat_sees_the_link() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("t");
    let link = dir.path().join("l");
    hc_sys::write_text_file(&target, "x").await.unwrap();
    std::os::unix::fs::symlink(&target, &link).unwrap();

    assert!(hc_sys::lstat(&link).await.unwrap().is_symlink);
    assert!(hc_sys::stat(&link).await.unwrap().is_file);
}

#[tokio::test]
async fn remove_needs_recursive_for_non_empty_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("sub");
    hc_sys::mkdir(&sub, false).await.unwrap();
    hc_sys::write_text_file(sub.join("f"), "x").await.unwrap();

    assert!(hc_sys::remove(&sub, false).await.is_err());
    hc_sys::remove(&sub, true).await.unwrap();
    assert!(hc_sys::stat(&sub).await.is_err());
}

#[tokio::test]
async fn open_read_write_seek() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f");
    let mut file = hc_sys::open(&path, OpenOptions::read_write()).await.unwrap();
    assert_eq!(file.write(b"abcdef").await.unwrap(), 6);

    assert_eq!(file.seek(2, 0).await.unwrap(), 2);
    let mut buf = [0u8; 3];
    assert_eq!(file.read(&mut buf).await.unwrap(), 3);
    assert_eq!(&buf, b"cde");

    assert_eq!(file.seek(-1, 2).await.unwrap(), 5);
    assert_eq!(file.seek(-2, 1).await.unwrap(), 3);

    let err = file.seek(0, 7).await.unwrap_err();
    assert!(matches!(err, SysError::InvalidSeekMode(7)));
    assert_eq!(err.code(), ErrorCode::ConfigInvalidSeekMode);
    assert!(file.seek(-1, 0).await.is_err());

    file.close().await.unwrap();
    assert_eq!(hc_sys::read_text_file(&path).await.unwrap(), "abcdef");
}
