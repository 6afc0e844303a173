//! The run pipeline: inputs, settings, provisioning, execution, verdict.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use agentrun_core::{classify, ConfigurationError, Outcome, ProcessExit, RunId, RunSummary};
use agentrun_provision::{Fetcher, ProvisionError, Provisioner};
use agentrun_sdk::{AgentExecutor, LogSink, SdkError, StreamObserver};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::host::HostEnvironment;
use crate::inputs;
use crate::settings;

/// Output carrying the conclusion tag.
pub const OUTPUT_CONCLUSION: &str = "conclusion";
/// Output carrying the agent's answer text.
pub const OUTPUT_CONTENT: &str = "content";

/// Errors that end a run before an outcome could be classified.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("agent execution failed: {0}")]
    Agent(#[from] SdkError),

    #[error("failed to set output '{name}': {source}")]
    Output {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Drives one agent run end to end.
pub struct Runner<F> {
    config: Config,
    provisioner: Provisioner<F>,
    observer: Arc<dyn StreamObserver>,
}

impl<F: Fetcher> Runner<F> {
    /// Create a runner downloading through `fetcher` and reporting live
    /// output to `observer`.
    pub fn new(config: Config, fetcher: F, observer: Arc<dyn StreamObserver>) -> Self {
        Self {
            config,
            provisioner: Provisioner::new(fetcher),
            observer,
        }
    }

    /// Location of the run log.
    pub fn log_path(&self) -> std::path::PathBuf {
        self.config.log_path()
    }

    /// User-visible failure message for `outcome`, `None` on success.
    pub fn failure_message(&self, outcome: &Outcome) -> Option<String> {
        failure_message(outcome, &self.log_path(), self.config.timeout)
    }

    /// Execute the pipeline, publishing outputs on success.
    ///
    /// Configuration and provisioning errors short-circuit before anything is
    /// launched. Once the agent ran, the result is always an [`Outcome`].
    pub async fn run(&self, host: &mut dyn HostEnvironment) -> Result<Outcome, RunError> {
        let run_id = RunId::generate();
        info!(
            run_id = %run_id,
            working_dir = %self.config.working_dir.display(),
            "Starting agent run"
        );

        let task = inputs::resolve_task(&*host, &self.config)?;
        settings::materialize(task.settings.as_deref(), &self.config.settings_path()).await?;

        let binary = self
            .provisioner
            .provision(&self.config.binary_url, &self.config.binary_path())
            .await?;

        let mut executor =
            AgentExecutor::new(&binary.local_path).with_environment(task.environment);
        if let Some(timeout) = self.config.timeout {
            executor = executor.with_timeout(timeout);
        }

        let sink = LogSink::open(self.config.log_path()).await?;
        let report = executor
            .execute(&task.request, sink, Arc::clone(&self.observer))
            .await?;

        if let Some(record) = &report.output.record {
            debug!(run_id = %run_id, record = record.as_str(), "Final result record");
        }
        let classification = classify(
            report.exit,
            report.output.record.as_ref(),
            self.config.subtype_policy,
        );
        if let Some(warning) = &classification.warning {
            warn!(run_id = %run_id, warning = %warning, "Agent result is not a success");
            host.warning(warning);
        }

        let summary = RunSummary {
            run_id,
            exit: report.exit,
            started_at: report.started_at,
            finished_at: report.finished_at,
            stdout_bytes: report.output.stdout.bytes,
            stderr_bytes: report.output.stderr.bytes,
            log_path: self.config.log_path(),
        };
        info!(
            run_id = %summary.run_id,
            exit = %summary.exit,
            duration_ms = summary.duration_ms(),
            stdout_bytes = summary.stdout_bytes,
            stderr_bytes = summary.stderr_bytes,
            discarded_lines = report.output.discarded_lines,
            conclusion = classification.outcome.conclusion(),
            log = %summary.log_path.display(),
            "Agent run finished"
        );

        if let Outcome::Success { content } = &classification.outcome {
            set_output(host, OUTPUT_CONCLUSION, classification.outcome.conclusion())?;
            set_output(host, OUTPUT_CONTENT, content)?;
        }

        Ok(classification.outcome)
    }
}

fn set_output(host: &mut dyn HostEnvironment, name: &str, value: &str) -> Result<(), RunError> {
    host.set_output(name, value).map_err(|source| RunError::Output {
        name: name.to_string(),
        source,
    })
}

fn failure_message(outcome: &Outcome, log_path: &Path, timeout: Option<Duration>) -> Option<String> {
    let reason = match outcome {
        Outcome::Success { .. } => return None,
        Outcome::Failure { reason } => reason.clone(),
        Outcome::IndeterminateFailure { exit } => match (exit, timeout) {
            (ProcessExit::TimedOut, Some(limit)) => {
                format!("agent timed out after {:?} and was killed", limit)
            }
            (ProcessExit::TimedOut, None) => "agent timed out and was killed".to_string(),
            (ProcessExit::Signal(signal), _) => {
                format!("agent terminated by signal {}", signal)
            }
            (ProcessExit::Code(code), _) => format!("agent exited with code {}", code),
        },
    };
    Some(format!("{} (log: {})", reason, log_path.display()))
}
