//! Task request and run summary types.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProcessExit, RunId};

/// Everything the launcher needs to know about the task itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Resolved task prompt. Never empty.
    pub prompt: String,

    /// Resolved system prompt, if one was supplied.
    pub system_prompt: Option<String>,

    /// Directory the agent works in.
    pub working_dir: PathBuf,

    /// Additional arguments appended after the fixed flags.
    pub extra_args: Vec<String>,
}

impl TaskRequest {
    /// Create a request with just a prompt and working directory.
    pub fn new(prompt: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            working_dir: working_dir.into(),
            extra_args: Vec::new(),
        }
    }

    /// Builder method to set the system prompt. Empty strings are ignored.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        self.system_prompt = (!system_prompt.is_empty()).then_some(system_prompt);
        self
    }

    /// Builder method to append extra arguments.
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Directory the agent works in.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

/// Summary of a finished run, logged once the outcome is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: RunId,

    /// How the process ended.
    pub exit: ProcessExit,

    /// When the process was spawned.
    pub started_at: DateTime<Utc>,

    /// When the process was reaped.
    pub finished_at: DateTime<Utc>,

    /// Bytes read from stdout.
    pub stdout_bytes: u64,

    /// Bytes read from stderr (without log prefixes).
    pub stderr_bytes: u64,

    /// Location of the run log.
    pub log_path: PathBuf,
}

impl RunSummary {
    /// Wall-clock duration of the process in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
