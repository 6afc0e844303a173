//! Error types for binary provisioning.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while provisioning the agent binary.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The server answered with something other than 200.
    #[error("download of {url} failed with HTTP status {status}")]
    Download { url: String, status: u16 },

    /// The request itself failed (DNS, TLS, connection reset...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing or marking the artifact failed.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
