//! Filesystem cache storage with atomic publish.
//!
//! Entries are written to a uniquely named temporary file in the destination
//! directory and then renamed into place. A rename within one directory is
//! atomic on POSIX filesystems, so a reader opening the final path sees either
//! no file or the complete file.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::io::AsyncWriteExt;

/// Suffix of in-progress cache writes.
pub const TEMP_SUFFIX: &str = "tmp";

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Cache directory tree rooted at a fixed path.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a relative cache path.
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Read a cached entry.
    ///
    /// Returns `Ok(None)` when the entry does not exist.
    pub async fn read(&self, relative: &Path) -> std::io::Result<Option<Bytes>> {
        match tokio::fs::read(self.resolve(relative)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[cfg(test)]
    async fn contains(&self, relative: &Path) -> bool {
        tokio::fs::metadata(self.resolve(relative))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Atomically publish `data` at the relative path.
    ///
    /// Parent directories are created as needed. An existing entry is replaced.
    /// On failure the temporary file is removed and nothing is published.
    pub async fn publish(&self, relative: &Path, data: &[u8]) -> std::io::Result<PathBuf> {
        let target = self.resolve(relative);
        let parent = target
            .parent()
            .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "cache path has no parent"))?;
        tokio::fs::create_dir_all(parent).await?;

        let temp = temp_path_for(&target);
        if let Err(e) = write_synced(&temp, data).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }

        Ok(target)
    }

    /// Delete temporary files left behind by writes that never finished,
    /// such as those of a process killed mid-publish.
    ///
    /// Only call this while no publish is running. Returns the number of
    /// files removed; a missing root is not an error.
    pub async fn sweep_temp_files(&self) -> std::io::Result<usize> {
        let mut removed = 0;
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if is_temp_path(&path) {
                    match tokio::fs::remove_file(&path).await {
                        Ok(()) => removed += 1,
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        Ok(removed)
    }
}

/// Whether `path` is named like the output of [`temp_path_for`].
fn is_temp_path(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'));
    hidden && path.extension().is_some_and(|ext| ext == TEMP_SUFFIX)
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

/// Hidden sibling of `target`, unique per process and per write.
fn temp_path_for(target: &Path) -> PathBuf {
    let seq = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let mut name = OsString::from(".");
    name.push(target.file_name().unwrap_or_default());
    name.push(format!(".{}.{}.{}", std::process::id(), seq, TEMP_SUFFIX));
    target.with_file_name(name)
}
