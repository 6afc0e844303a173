//! Concurrent stdout/stderr supervision.
//!
//! Each pipe gets its own task. Reading them one after the other would let
//! the child block on a full stderr pipe while we wait on stdout, so the two
//! consumers never wait on each other; they only share the [`LogSink`].

use std::sync::Arc;
use std::time::Duration;

use agentrun_core::{ResultExtractor, ResultRecord};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::SdkError;
use crate::log_sink::LogSink;
use crate::protocol::{LineBuffer, StreamObserver};

/// Prefix written in front of every stderr chunk in the run log.
pub const STDERR_PREFIX: &[u8] = b"[stderr] ";

const CHUNK_SIZE: usize = 8 * 1024;

/// Byte and chunk counters for one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub bytes: u64,
    pub chunks: u64,
}

impl StreamStats {
    fn record(&mut self, len: usize) {
        self.bytes += len as u64;
        self.chunks += 1;
    }
}

/// Everything the supervisor accumulated over the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct SupervisedOutput {
    /// Last JSON object line seen on stdout.
    pub record: Option<ResultRecord>,
    /// Non-blank stdout lines that were not JSON objects.
    pub discarded_lines: u64,
    pub stdout: StreamStats,
    pub stderr: StreamStats,
}

impl SupervisedOutput {
    /// Bytes the supervisor wrote to the log, prefixes included.
    pub fn logged_bytes(&self) -> u64 {
        self.stdout.bytes + self.stderr.bytes + self.stderr.chunks * STDERR_PREFIX.len() as u64
    }
}

/// Spawns the two stream consumers.
#[derive(Clone)]
pub struct StreamSupervisor {
    sink: LogSink,
    observer: Arc<dyn StreamObserver>,
}

impl StreamSupervisor {
    /// Create a supervisor writing to `sink` and reporting to `observer`.
    pub fn new(sink: LogSink, observer: Arc<dyn StreamObserver>) -> Self {
        Self { sink, observer }
    }

    /// Start draining both streams on independent tasks.
    pub fn spawn<O, E>(&self, stdout: O, stderr: E) -> SupervisorHandle
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let stdout_task = tokio::spawn(drain_stdout(
            stdout,
            self.sink.clone(),
            Arc::clone(&self.observer),
        ));
        let stderr_task = tokio::spawn(drain_stderr(
            stderr,
            self.sink.clone(),
            Arc::clone(&self.observer),
        ));

        SupervisorHandle {
            stdout: stdout_task,
            stderr: stderr_task,
        }
    }
}

/// Handle to the running stream consumers.
pub struct SupervisorHandle {
    stdout: JoinHandle<Result<(ResultExtractor, StreamStats), SdkError>>,
    stderr: JoinHandle<Result<StreamStats, SdkError>>,
}

impl SupervisorHandle {
    /// Wait until both streams hit EOF.
    pub async fn join(self) -> Result<SupervisedOutput, SdkError> {
        let (stdout, stderr) = tokio::join!(self.stdout, self.stderr);
        let (extractor, stdout_stats) =
            stdout.map_err(|e| SdkError::TaskFailed(e.to_string()))??;
        let stderr_stats = stderr.map_err(|e| SdkError::TaskFailed(e.to_string()))??;

        Ok(SupervisedOutput {
            discarded_lines: extractor.discarded(),
            record: extractor.finish(),
            stdout: stdout_stats,
            stderr: stderr_stats,
        })
    }

    /// Like [`join`](Self::join), but give up after `grace`.
    ///
    /// Used after a forced kill, when a surviving grandchild may still hold
    /// the pipes open. Abandoned consumers are aborted and nothing is returned.
    pub async fn join_within(self, grace: Duration) -> Result<Option<SupervisedOutput>, SdkError> {
        let stdout_abort = self.stdout.abort_handle();
        let stderr_abort = self.stderr.abort_handle();

        match tokio::time::timeout(grace, self.join()).await {
            Ok(output) => output.map(Some),
            Err(_) => {
                warn!(grace_secs = grace.as_secs(), "Streams still open after kill, abandoning them");
                stdout_abort.abort();
                stderr_abort.abort();
                Ok(None)
            }
        }
    }
}

async fn drain_stdout<R>(
    mut reader: R,
    sink: LogSink,
    observer: Arc<dyn StreamObserver>,
) -> Result<(ResultExtractor, StreamStats), SdkError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut lines = LineBuffer::default();
    let mut extractor = ResultExtractor::default();
    let mut stats = StreamStats::default();

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, bytes = stats.bytes, "Error reading agent stdout");
                return Err(SdkError::Io(e));
            }
        };
        let chunk = &buf[..n];
        stats.record(n);

        if let Err(e) = observer.on_stdout(chunk).await {
            warn!(error = %e, "Observer failed on stdout chunk");
        }
        sink.append(chunk).await?;

        for line in lines.push(chunk) {
            extractor = extractor.observe(&line);
        }
    }

    if let Some(line) = lines.finish() {
        extractor = extractor.observe(&line);
    }

    info!(
        bytes = stats.bytes,
        chunks = stats.chunks,
        json_lines = extractor.accepted(),
        "Agent stdout closed (EOF)"
    );
    Ok((extractor, stats))
}

async fn drain_stderr<R>(
    mut reader: R,
    sink: LogSink,
    observer: Arc<dyn StreamObserver>,
) -> Result<StreamStats, SdkError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut stats = StreamStats::default();

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, bytes = stats.bytes, "Error reading agent stderr");
                return Err(SdkError::Io(e));
            }
        };
        let chunk = &buf[..n];
        stats.record(n);

        if let Err(e) = observer.on_stderr(chunk).await {
            warn!(error = %e, "Observer failed on stderr chunk");
        }
        sink.append_prefixed(STDERR_PREFIX, chunk).await?;
    }

    debug!(bytes = stats.bytes, chunks = stats.chunks, "Agent stderr closed (EOF)");
    Ok(stats)
}
