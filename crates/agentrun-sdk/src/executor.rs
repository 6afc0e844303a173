//! Agent executor for running the provisioned binary as a subprocess.
//!
//! This module provides the main `AgentExecutor` type. It assembles the
//! argument vector and environment, spawns the child, hands its pipes to the
//! [`StreamSupervisor`] and waits for exit.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use agentrun_core::{ProcessExit, ProcessState, TaskRequest};
use chrono::{DateTime, Utc};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, error, info, warn};

use crate::environment::AgentEnvironment;
use crate::error::SdkError;
use crate::log_sink::LogSink;
use crate::protocol::StreamObserver;
use crate::supervisor::{StreamSupervisor, SupervisedOutput};

/// Output format requested from the agent: one JSON message per line.
pub const OUTPUT_FORMAT: &str = "stream-json";

/// How long to keep draining pipes after a forced kill.
const KILL_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Result of one agent execution, before classification.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// How the process ended.
    pub exit: ProcessExit,

    /// What the stream supervisor accumulated.
    pub output: SupervisedOutput,

    /// When the process was spawned.
    pub started_at: DateTime<Utc>,

    /// When the process was reaped.
    pub finished_at: DateTime<Utc>,
}

/// Executor for the agent binary.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use agentrun_core::TaskRequest;
/// use agentrun_sdk::{AgentEnvironment, AgentExecutor, ConsoleObserver, LogSink};
///
/// async fn run() -> Result<(), Box<dyn std::error::Error>> {
///     let executor = AgentExecutor::new("/work/.agentrun/bin/agent")
///         .with_environment(AgentEnvironment::new("user", "machine", "default"));
///
///     let request = TaskRequest::new("What is 2 + 2?", "/work");
///     let sink = LogSink::open("/work/.agentrun/output.log").await?;
///     let report = executor.execute(&request, sink, Arc::new(ConsoleObserver)).await?;
///
///     println!("exit: {}", report.exit);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AgentExecutor {
    /// Path to the agent executable.
    binary_path: PathBuf,

    /// Variables layered over the host environment.
    environment: AgentEnvironment,

    /// Kill the agent after this long (optional).
    timeout: Option<Duration>,
}

impl AgentExecutor {
    /// Create a new executor for the binary at `binary_path`.
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            environment: AgentEnvironment::default(),
            timeout: None,
        }
    }

    /// Set the environment overlay.
    pub fn with_environment(mut self, environment: AgentEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Kill the agent if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Path to the agent executable.
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Build the argument vector for `request`.
    ///
    /// The order is part of the agent's contract: working directory, prompt,
    /// output format, then the optional system prompt, then extra arguments.
    pub fn build_args(request: &TaskRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--cwd".into(),
            request.working_dir().as_os_str().to_os_string(),
            "--prompt".into(),
            request.prompt.clone().into(),
            "--output-format".into(),
            OUTPUT_FORMAT.into(),
        ];

        if let Some(system) = &request.system_prompt {
            args.push("--system-prompt".into());
            args.push(system.clone().into());
        }

        args.extend(request.extra_args.iter().map(OsString::from));
        args
    }

    fn command(&self, request: &TaskRequest) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(Self::build_args(request));

        // No stdin; the prompt travels as an argument
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .current_dir(request.working_dir())
            .kill_on_drop(true);

        for (key, value) in self.environment.entries() {
            cmd.env(key, value);
        }

        cmd
    }

    /// Spawn the agent for `request`.
    pub fn launch(&self, request: &TaskRequest) -> Result<RunningAgent, SdkError> {
        info!(
            binary = %self.binary_path.display(),
            working_dir = %request.working_dir().display(),
            prompt_len = request.prompt.len(),
            system_prompt = request.system_prompt.is_some(),
            extra_args = request.extra_args.len(),
            credential = self.environment.has_api_key(),
            "Spawning agent process"
        );

        let mut state = ProcessState::default();
        let child = self.command(request).spawn().map_err(|source| {
            error!(error = %source, "Failed to spawn agent process");
            SdkError::Launch {
                path: self.binary_path.clone(),
                source,
            }
        })?;

        state.start(child.id())?;
        debug!(pid = ?child.id(), "Agent process spawned");

        Ok(RunningAgent {
            child,
            state,
            started_at: Utc::now(),
        })
    }

    /// Launch the agent, supervise its streams into `sink` and wait for exit.
    ///
    /// The sink is closed only after the process exited and both streams
    /// reached EOF.
    pub async fn execute(
        &self,
        request: &TaskRequest,
        sink: LogSink,
        observer: Arc<dyn StreamObserver>,
    ) -> Result<ExecutionReport, SdkError> {
        let mut agent = self.launch(request)?;
        let (stdout, stderr) = agent.take_streams()?;
        let pid = agent.id();

        let handle = StreamSupervisor::new(sink.clone(), observer).spawn(stdout, stderr);

        info!(pid = ?pid, "Waiting for agent process to complete...");
        let exit = agent.wait(self.timeout).await?;
        let finished_at = Utc::now();

        let output = match exit {
            ProcessExit::TimedOut => handle
                .join_within(KILL_DRAIN_GRACE)
                .await?
                .unwrap_or_default(),
            _ => handle.join().await?,
        };
        sink.close().await?;

        info!(
            exit = %exit,
            stdout_bytes = output.stdout.bytes,
            stderr_bytes = output.stderr.bytes,
            logged_bytes = output.logged_bytes(),
            has_record = output.record.is_some(),
            "Agent process finished"
        );

        Ok(ExecutionReport {
            exit,
            output,
            started_at: agent.started_at(),
            finished_at,
        })
    }
}

/// A spawned agent process.
pub struct RunningAgent {
    child: Child,
    state: ProcessState,
    started_at: DateTime<Utc>,
}

impl RunningAgent {
    /// OS process id, while the child is alive.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// When the process was spawned.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Take the stdout/stderr pipes. Can only be done once.
    pub fn take_streams(&mut self) -> Result<(ChildStdout, ChildStderr), SdkError> {
        let stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| SdkError::ProtocolError("Failed to get stdout".to_string()))?;
        let stderr = self
            .child
            .stderr
            .take()
            .ok_or_else(|| SdkError::ProtocolError("Failed to get stderr".to_string()))?;
        Ok((stdout, stderr))
    }

    /// Wait for exit, killing the child if `timeout` elapses first.
    pub async fn wait(&mut self, timeout: Option<Duration>) -> Result<ProcessExit, SdkError> {
        let exit = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.child.wait()).await {
                Ok(status) => exit_from_status(status?),
                Err(_) => {
                    warn!(timeout_secs = limit.as_secs(), "Agent timed out, killing");
                    self.child.kill().await?;
                    ProcessExit::TimedOut
                }
            },
            None => exit_from_status(self.child.wait().await?),
        };

        self.state.finish(exit)?;
        info!(exit = %exit, "Agent process exited");
        Ok(exit)
    }
}

fn exit_from_status(status: ExitStatus) -> ProcessExit {
    if let Some(code) = status.code() {
        return ProcessExit::Code(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ProcessExit::Signal(signal);
        }
    }
    ProcessExit::Signal(-1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChannelObserver;

    fn args_as_strings(request: &TaskRequest) -> Vec<String> {
        AgentExecutor::build_args(request)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_args_fixed_order() {
        let request = TaskRequest::new("fix it", "/work");
        assert_eq!(
            args_as_strings(&request),
            vec!["--cwd", "/work", "--prompt", "fix it", "--output-format", "stream-json"]
        );
    }

    #[test]
    fn test_args_with_system_prompt_and_extras() {
        let request = TaskRequest::new("fix it", "/work")
            .with_system_prompt("be brief")
            .with_extra_args(["--max-turns", "5"]);
        assert_eq!(
            args_as_strings(&request),
            vec![
                "--cwd",
                "/work",
                "--prompt",
                "fix it",
                "--output-format",
                "stream-json",
                "--system-prompt",
                "be brief",
                "--max-turns",
                "5",
            ]
        );
    }

    #[test]
    fn test_executor_builder() {
        let executor = AgentExecutor::new("/bin/agent")
            .with_environment(AgentEnvironment::new("u", "m", "default"))
            .with_timeout(Duration::from_secs(60));

        assert_eq!(executor.binary_path(), Path::new("/bin/agent"));
        assert_eq!(executor.timeout, Some(Duration::from_secs(60)));
        assert_eq!(executor.environment.entries().len(), 4);
    }

    #[tokio::test]
    async fn test_launch_missing_binary_is_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let executor = AgentExecutor::new(dir.path().join("does-not-exist"));
        let request = TaskRequest::new("p", dir.path());

        match executor.launch(&request) {
            Err(SdkError::Launch { path, source }) => {
                assert!(path.ends_with("does-not-exist"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            Err(other) => panic!("expected Launch error, got {:?}", other),
            Ok(_) => panic!("expected Launch error, got a process"),
        }
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        use serial_test::serial;

        fn write_script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("agent.sh");
            std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        #[serial]
        async fn test_execute_end_to_end() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(
                dir.path(),
                concat!(
                    "echo \"args: $*\"\n",
                    "echo \"user=$AGENT_USER_ID key=${AGENT_API_KEY-unset}\"\n",
                    "echo 'warming up' >&2\n",
                    "echo '{\"subtype\":\"success\",\"message\":{\"content\":[{\"text\":\"done\"}]}}'\n",
                    "echo 'trailing chatter'\n",
                ),
            );

            let executor = AgentExecutor::new(&script)
                .with_environment(AgentEnvironment::new("u1", "m1", "default"));
            let request = TaskRequest::new("hello", dir.path());
            let log_path = dir.path().join("run.log");
            let sink = LogSink::open(&log_path).await.unwrap();
            let (observer, _rx) = ChannelObserver::new();

            let report = executor
                .execute(&request, sink, Arc::new(observer))
                .await
                .unwrap();

            assert_eq!(report.exit, ProcessExit::Code(0));
            let message = report.output.record.as_ref().unwrap().parse().unwrap();
            assert_eq!(message.text(), Some("done"));

            let log = std::fs::read_to_string(&log_path).unwrap();
            assert!(log.contains("args: --cwd"));
            assert!(log.contains("--prompt hello --output-format stream-json"));
            assert!(log.contains("user=u1 key=unset"));
            assert!(log.contains("[stderr] warming up"));
            assert_eq!(log.len() as u64, report.output.logged_bytes());
        }

        #[tokio::test]
        #[serial]
        async fn test_execute_reports_nonzero_exit() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(dir.path(), "echo '{\"subtype\":\"success\"}'\nexit 7\n");

            let executor = AgentExecutor::new(&script);
            let request = TaskRequest::new("hello", dir.path());
            let sink = LogSink::open(dir.path().join("run.log")).await.unwrap();
            let (observer, _rx) = ChannelObserver::new();

            let report = executor
                .execute(&request, sink, Arc::new(observer))
                .await
                .unwrap();

            assert_eq!(report.exit, ProcessExit::Code(7));
            assert!(report.output.record.is_some());
        }

        #[tokio::test]
        #[serial]
        async fn test_execute_kills_on_timeout() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(dir.path(), "exec sleep 30\n");

            let executor = AgentExecutor::new(&script).with_timeout(Duration::from_millis(200));
            let request = TaskRequest::new("hello", dir.path());
            let sink = LogSink::open(dir.path().join("run.log")).await.unwrap();
            let (observer, _rx) = ChannelObserver::new();

            let report = executor
                .execute(&request, sink, Arc::new(observer))
                .await
                .unwrap();

            assert_eq!(report.exit, ProcessExit::TimedOut);
            assert!(report.output.record.is_none());
        }

        #[tokio::test]
        #[serial]
        async fn test_launch_non_executable_is_launch_error() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("agent");
            std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

            let executor = AgentExecutor::new(&path);
            let request = TaskRequest::new("hello", dir.path());

            match executor.launch(&request) {
                Err(SdkError::Launch { path: reported, source }) => {
                    assert_eq!(reported, path);
                    assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
                }
                Err(other) => panic!("expected Launch error, got {:?}", other),
                Ok(_) => panic!("expected Launch error, got a process"),
            }
        }

        #[tokio::test]
        #[serial]
        async fn test_running_agent_state_transitions() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(dir.path(), "exit 0\n");

            let executor = AgentExecutor::new(&script);
            let request = TaskRequest::new("hello", dir.path());
            let mut agent = executor.launch(&request).unwrap();
            assert!(matches!(agent.state(), ProcessState::Running { .. }));

            let _streams = agent.take_streams().unwrap();
            assert!(agent.take_streams().is_err());

            let exit = agent.wait(None).await.unwrap();
            assert_eq!(exit, ProcessExit::Code(0));
            assert_eq!(agent.state().exit(), Some(ProcessExit::Code(0)));
        }
    }
}
