//! Durable, append-only run log.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::SdkError;

/// Append-only log file shared by the stdout and stderr consumers.
///
/// Every append holds the lock for the whole write, so chunks from the two
/// streams never tear into each other. Clones share the same handle.
#[derive(Debug, Clone)]
pub struct LogSink {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl LogSink {
    /// Open `path` in append mode, creating it and its parent directory.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SdkError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| sink_error(&path, source))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| sink_error(&path, source))?;

        debug!(path = %path.display(), "Opened run log");
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Location of the log on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `bytes` verbatim.
    pub async fn append(&self, bytes: &[u8]) -> Result<(), SdkError> {
        let mut file = self.file.lock().await;
        file.write_all(bytes)
            .await
            .map_err(|source| sink_error(&self.path, source))
    }

    /// Append `prefix` followed by `bytes` as a single write.
    pub async fn append_prefixed(&self, prefix: &[u8], bytes: &[u8]) -> Result<(), SdkError> {
        let mut record = Vec::with_capacity(prefix.len() + bytes.len());
        record.extend_from_slice(prefix);
        record.extend_from_slice(bytes);
        self.append(&record).await
    }

    /// Flush and sync the log. Call only after both streams reached EOF.
    pub async fn close(self) -> Result<(), SdkError> {
        let mut file = self.file.lock().await;
        file.flush()
            .await
            .map_err(|source| sink_error(&self.path, source))?;
        file.sync_all()
            .await
            .map_err(|source| sink_error(&self.path, source))?;
        debug!(path = %self.path.display(), "Closed run log");
        Ok(())
    }
}

fn sink_error(path: &Path, source: std::io::Error) -> SdkError {
    SdkError::LogSink {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_appends_and_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.log");

        let sink = LogSink::open(&path).await.unwrap();
        sink.append(b"one\n").await.unwrap();
        sink.append_prefixed(b"[stderr] ", b"two\n").await.unwrap();
        sink.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "one\n[stderr] two\n");
    }

    #[tokio::test]
    async fn test_reopen_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let sink = LogSink::open(&path).await.unwrap();
        sink.append(b"first run\n").await.unwrap();
        sink.close().await.unwrap();

        let sink = LogSink::open(&path).await.unwrap();
        sink.append(b"second run\n").await.unwrap();
        sink.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first run\nsecond run\n");
    }

    #[tokio::test]
    async fn test_open_fails_on_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = LogSink::open(dir.path()).await.unwrap_err();
        assert!(matches!(err, SdkError::LogSink { .. }));
    }
}
