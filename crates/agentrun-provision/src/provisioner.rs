//! Fetch, persist and mark the agent binary executable.
//!
//! The binary is treated as disposable per-run infrastructure: every run
//! downloads it again. Idempotency therefore only concerns the end state,
//! an executable file at the destination.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::error::ProvisionError;
use crate::http::Fetcher;

/// A binary that was downloaded and marked executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedBinary {
    /// Where it was fetched from.
    pub source_url: String,

    /// Where it lives now.
    pub local_path: PathBuf,

    /// Whether the executable bit is set.
    pub executable: bool,

    /// Size of the artifact in bytes.
    pub bytes: u64,
}

/// Downloads binaries through a [`Fetcher`].
pub struct Provisioner<F> {
    fetcher: F,
}

impl<F: Fetcher> Provisioner<F> {
    /// Create a provisioner using `fetcher` for transport.
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Download `url` to `dest` and mark it executable.
    ///
    /// A single GET is issued; anything but 200 fails with
    /// [`ProvisionError::Download`] before the destination is touched. The
    /// executable bit is set only after the body has been fully written and
    /// synced.
    pub async fn provision(&self, url: &str, dest: &Path) -> Result<ProvisionedBinary, ProvisionError> {
        info!(url = %url, dest = %dest.display(), "Provisioning agent binary");

        let mut response = self.fetcher.get(url).await?;
        if response.status != 200 {
            error!(url = %url, status = response.status, "Binary download failed");
            return Err(ProvisionError::Download {
                url: url.to_string(),
                status: response.status,
            });
        }

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| io_error(parent, source))?;
        }

        // Start from a fresh file so a leftover executable bit never covers a
        // partial write.
        match tokio::fs::remove_file(dest).await {
            Ok(()) => debug!(dest = %dest.display(), "Removed previous binary"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(io_error(dest, source)),
        }

        let bytes = match write_body(dest, response.body.as_mut()).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(dest = %dest.display(), error = %e, "Download interrupted, removing partial file");
                let _ = tokio::fs::remove_file(dest).await;
                return Err(e);
            }
        };

        mark_executable(dest).await?;
        info!(dest = %dest.display(), bytes = bytes, "Agent binary ready");

        Ok(ProvisionedBinary {
            source_url: url.to_string(),
            local_path: dest.to_path_buf(),
            executable: true,
            bytes,
        })
    }
}

async fn write_body(
    dest: &Path,
    body: &mut dyn crate::http::ResponseBody,
) -> Result<u64, ProvisionError> {
    let mut file = File::create(dest)
        .await
        .map_err(|source| io_error(dest, source))?;

    let mut written = 0u64;
    while let Some(chunk) = body.next_chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|source| io_error(dest, source))?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|source| io_error(dest, source))?;
    file.sync_all()
        .await
        .map_err(|source| io_error(dest, source))?;
    Ok(written)
}

#[cfg(unix)]
async fn mark_executable(path: &Path) -> Result<(), ProvisionError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|source| io_error(path, source))
}

#[cfg(not(unix))]
async fn mark_executable(_path: &Path) -> Result<(), ProvisionError> {
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> ProvisionError {
    ProvisionError::Io {
        path: path.to_path_buf(),
        source,
    }
}
