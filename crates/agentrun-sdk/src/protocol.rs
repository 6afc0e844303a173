//! Stream protocol between the agent and the supervisor.
//!
//! The agent speaks a line-oriented protocol on stdout. Reads come back in
//! arbitrary chunks, so [`LineBuffer`] reassembles lines before they reach the
//! result extractor. [`StreamObserver`] is the seam through which callers see
//! each raw chunk as it arrives.

use async_trait::async_trait;

use crate::error::SdkError;

/// Callbacks invoked for every chunk read from the agent.
///
/// Implement this trait to control where live output goes. Errors returned
/// here are logged and otherwise ignored: observing must never stall the
/// pipes.
#[async_trait]
pub trait StreamObserver: Send + Sync {
    /// Called with each raw stdout chunk, in arrival order.
    async fn on_stdout(&self, chunk: &[u8]) -> Result<(), SdkError>;

    /// Called with each raw stderr chunk, in arrival order.
    async fn on_stderr(&self, chunk: &[u8]) -> Result<(), SdkError>;
}

/// Reassembles newline-delimited records from arbitrary byte chunks.
///
/// Works on bytes so a multi-byte character split across two reads is joined
/// before decoding.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line it completed, without the newline.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            lines.push(decode_line(&self.pending));
            self.pending.clear();
            rest = &rest[pos + 1..];
        }
        self.pending.extend_from_slice(rest);

        lines
    }

    /// Flush the unterminated trailing line, if any.
    pub fn finish(self) -> Option<String> {
        (!self.pending.is_empty()).then(|| decode_line(&self.pending))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
