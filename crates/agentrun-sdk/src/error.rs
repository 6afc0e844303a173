//! Error types for the agent SDK.

use std::path::PathBuf;

use agentrun_core::InvalidTransition;
use thiserror::Error;

/// Errors that can occur while launching or supervising the agent.
#[derive(Debug, Error)]
pub enum SdkError {
    /// The agent executable could not be started.
    #[error("failed to launch agent at {}: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run log could not be opened or written.
    #[error("run log {} failed: {source}", path.display())]
    LogSink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a pipe, waiting on or killing the child failed.
    #[error("process I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stdio handle was not piped.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// A stream consumer task panicked or was cancelled.
    #[error("stream task failed: {0}")]
    TaskFailed(String),

    /// Lifecycle misuse.
    #[error(transparent)]
    State(#[from] InvalidTransition),

    /// Channel send error.
    #[error("Channel closed")]
    ChannelClosed,
}
