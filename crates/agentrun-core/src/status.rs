//! Process lifecycle states and the result-subtype policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the agent process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessExit {
    /// Exited normally with a status code.
    Code(i32),
    /// Terminated by a signal (unix only), no status code.
    Signal(i32),
    /// Killed by the orchestrator after the configured timeout elapsed.
    TimedOut,
}

impl ProcessExit {
    /// The exit code, if the process exited normally.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Code(code) => Some(*code),
            Self::Signal(_) | Self::TimedOut => None,
        }
    }

    /// Returns true for a normal exit with code 0.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Code(0))
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit code {}", code),
            Self::Signal(signal) => write!(f, "signal {}", signal),
            Self::TimedOut => write!(f, "timeout"),
        }
    }
}

/// Lifecycle of the agent process.
///
/// Transitions only move forward: `NotStarted → Running → Exited`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessState {
    /// Command assembled, nothing spawned yet.
    #[default]
    NotStarted,
    /// Child is alive.
    Running { pid: Option<u32> },
    /// Child has been reaped.
    Exited { exit: ProcessExit },
}

/// Attempted a backwards or repeated lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid process state transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: &'static str,
    pub to: &'static str,
}

impl ProcessState {
    /// Returns true once the process has been reaped.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited { .. })
    }

    /// The exit status, once known.
    pub fn exit(&self) -> Option<ProcessExit> {
        match self {
            Self::Exited { exit } => Some(*exit),
            _ => None,
        }
    }

    /// Move to `Running`. Only valid from `NotStarted`.
    pub fn start(&mut self, pid: Option<u32>) -> Result<(), InvalidTransition> {
        match self {
            Self::NotStarted => {
                *self = Self::Running { pid };
                Ok(())
            }
            other => Err(InvalidTransition {
                from: other.name(),
                to: "running",
            }),
        }
    }

    /// Move to `Exited`. Only valid from `Running`.
    pub fn finish(&mut self, exit: ProcessExit) -> Result<(), InvalidTransition> {
        match self {
            Self::Running { .. } => {
                *self = Self::Exited { exit };
                Ok(())
            }
            other => Err(InvalidTransition {
                from: other.name(),
                to: "exited",
            }),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running { .. } => "running",
            Self::Exited { .. } => "exited",
        }
    }
}

/// What to do when the agent exits 0 but its final record is not a success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtypePolicy {
    /// Fail the run.
    #[default]
    Strict,
    /// Warn and report the run as successful.
    Lenient,
}

impl FromStr for SubtypePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!(
                "unknown subtype policy '{}', expected 'strict' or 'lenient'",
                other
            )),
        }
    }
}
