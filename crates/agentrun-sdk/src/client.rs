//! Observer implementations for the agent SDK.
//!
//! This module provides ready-to-use implementations of the `StreamObserver` trait.

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::SdkError;
use crate::protocol::StreamObserver;

/// Mirrors stdout to the host's stdout and surfaces stderr as warnings.
///
/// This is what the orchestrator uses for live visibility in CI logs.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

#[async_trait]
impl StreamObserver for ConsoleObserver {
    async fn on_stdout(&self, chunk: &[u8]) -> Result<(), SdkError> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(chunk).await?;
        stdout.flush().await?;
        Ok(())
    }

    async fn on_stderr(&self, chunk: &[u8]) -> Result<(), SdkError> {
        let text = String::from_utf8_lossy(chunk);
        let trimmed = text.trim_end();
        if !trimmed.is_empty() {
            warn!(stderr = %trimmed, "Agent stderr");
        }
        Ok(())
    }
}

/// Which pipe a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// A raw chunk forwarded by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    pub stream: StreamKind,
    pub bytes: Vec<u8>,
}

/// Forwards every chunk over an unbounded channel.
///
/// Useful for embedding the supervisor in a larger application, or for
/// asserting on what the agent printed.
///
/// # Example
///
/// ```rust,no_run
/// use agentrun_sdk::ChannelObserver;
///
/// let (observer, mut rx) = ChannelObserver::new();
///
/// tokio::spawn(async move {
///     while let Some(chunk) = rx.recv().await {
///         println!("{:?}: {} bytes", chunk.stream, chunk.bytes.len());
///     }
/// });
/// ```
pub struct ChannelObserver {
    chunk_tx: mpsc::UnboundedSender<StreamChunk>,
}

impl ChannelObserver {
    /// Create a new observer and the receiver for its chunks.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamChunk>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { chunk_tx: tx }, rx)
    }

    fn forward(&self, stream: StreamKind, chunk: &[u8]) -> Result<(), SdkError> {
        self.chunk_tx
            .send(StreamChunk {
                stream,
                bytes: chunk.to_vec(),
            })
            .map_err(|_| SdkError::ChannelClosed)
    }
}

#[async_trait]
impl StreamObserver for ChannelObserver {
    async fn on_stdout(&self, chunk: &[u8]) -> Result<(), SdkError> {
        self.forward(StreamKind::Stdout, chunk)
    }

    async fn on_stderr(&self, chunk: &[u8]) -> Result<(), SdkError> {
        self.forward(StreamKind::Stderr, chunk)
    }
}
