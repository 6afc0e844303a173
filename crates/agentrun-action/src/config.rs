//! Orchestrator configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use agentrun_core::SubtypePolicy;
use clap::Parser;

/// Directory under the working directory holding every artifact of a run.
pub const AGENT_DIR: &str = ".agentrun";

/// Model selection exported to the agent.
pub const MODEL_SELECTION: &str = "default";

/// Provision and run the agent for one task, reporting the result to the workflow.
#[derive(Parser, Debug)]
#[command(name = "agentrun", about = "Provision and run a coding agent for one workflow task")]
pub struct Args {
    /// Directory the agent works in
    #[arg(long, env = "AGENTRUN_WORKING_DIR", default_value = ".")]
    pub working_dir: PathBuf,

    /// URL of the agent binary to download
    #[arg(long, env = "AGENTRUN_BINARY_URL")]
    pub binary_url: String,

    /// Kill the agent after this many seconds (no limit by default)
    #[arg(long, env = "AGENTRUN_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// What a non-success result subtype means: strict fails, lenient warns
    #[arg(long, env = "AGENTRUN_SUBTYPE_POLICY", default_value = "strict")]
    pub subtype_policy: SubtypePolicy,

    /// Log level for the orchestrator (overrides RUST_LOG)
    #[arg(long, env = "AGENTRUN_LOG")]
    pub log_level: Option<String>,
}

/// Resolved orchestrator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute working directory.
    pub working_dir: PathBuf,

    /// Where to download the agent from.
    pub binary_url: String,

    /// Optional hard limit on the agent's runtime.
    pub timeout: Option<Duration>,

    /// Policy for non-success subtypes on a clean exit.
    pub subtype_policy: SubtypePolicy,
}

impl Config {
    /// Resolve `args`, making the working directory absolute.
    pub fn from_args(args: &Args) -> std::io::Result<Self> {
        let working_dir = std::fs::canonicalize(&args.working_dir)?;
        Ok(Self {
            timeout: args.timeout_secs.map(Duration::from_secs),
            subtype_policy: args.subtype_policy,
            ..Self::new(working_dir, args.binary_url.clone())
        })
    }

    /// Create a config rooted at `working_dir` with default policies.
    pub fn new(working_dir: impl Into<PathBuf>, binary_url: impl Into<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            binary_url: binary_url.into(),
            timeout: None,
            subtype_policy: SubtypePolicy::default(),
        }
    }

    fn artifact(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.working_dir.join(AGENT_DIR).join(relative)
    }

    /// Where the agent binary is provisioned.
    pub fn binary_path(&self) -> PathBuf {
        self.artifact("bin").join("agent")
    }

    /// Where the run log is appended.
    pub fn log_path(&self) -> PathBuf {
        self.artifact("output.log")
    }

    /// Where materialized settings are written.
    pub fn settings_path(&self) -> PathBuf {
        self.artifact("settings.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths_are_under_agent_dir() {
        let config = Config::new("/work", "https://example.invalid/agent");
        assert_eq!(config.binary_path(), Path::new("/work/.agentrun/bin/agent"));
        assert_eq!(config.log_path(), Path::new("/work/.agentrun/output.log"));
        assert_eq!(config.settings_path(), Path::new("/work/.agentrun/settings.json"));
    }

    #[test]
    fn test_args_parse_with_defaults() {
        let args = Args::try_parse_from(["agentrun", "--binary-url", "https://x/agent"]).unwrap();
        assert_eq!(args.working_dir, PathBuf::from("."));
        assert_eq!(args.subtype_policy, SubtypePolicy::Strict);
        assert!(args.timeout_secs.is_none());
    }

    #[test]
    fn test_args_parse_policy_and_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::try_parse_from([
            "agentrun",
            "--binary-url",
            "https://x/agent",
            "--working-dir",
            dir.path().to_str().unwrap(),
            "--subtype-policy",
            "lenient",
            "--timeout-secs",
            "90",
        ])
        .unwrap();

        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.subtype_policy, SubtypePolicy::Lenient);
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert!(config.working_dir.is_absolute());
    }

    #[test]
    fn test_args_reject_unknown_policy() {
        let result = Args::try_parse_from([
            "agentrun",
            "--binary-url",
            "https://x/agent",
            "--subtype-policy",
            "sometimes",
        ]);
        assert!(result.is_err());
    }
}
