//! Outcome classification.
//!
//! [`classify`] is a pure function of the exit status, the retained result
//! record and the subtype policy. It never looks at a live process.

use serde::{Deserialize, Serialize};

use crate::{ProcessExit, ResultRecord, SubtypePolicy};

/// Reason reported when the agent exited 0 without printing any JSON object.
pub const NO_VALID_JSON: &str = "no valid JSON output";

/// Final verdict of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "conclusion", rename_all = "snake_case")]
pub enum Outcome {
    /// The agent completed; `content` is its answer text (possibly empty).
    Success { content: String },
    /// The run failed for a known reason.
    Failure { reason: String },
    /// The process ended without an exit code (signal or timeout).
    IndeterminateFailure { exit: ProcessExit },
}

impl Outcome {
    /// Returns true for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Short tag for the host's output variables.
    pub fn conclusion(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Failure { .. } => "failure",
            Self::IndeterminateFailure { .. } => "indeterminate_failure",
        }
    }

    fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }
}

/// Verdict plus any non-fatal warning raised while deciding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: Outcome,
    pub warning: Option<String>,
}

impl From<Outcome> for Classification {
    fn from(outcome: Outcome) -> Self {
        Self {
            outcome,
            warning: None,
        }
    }
}

/// Map exit status and retained record to a verdict.
///
/// A non-zero exit always fails, whatever JSON the agent printed before dying.
pub fn classify(
    exit: ProcessExit,
    record: Option<&ResultRecord>,
    policy: SubtypePolicy,
) -> Classification {
    let code = match exit {
        ProcessExit::Code(code) => code,
        ProcessExit::Signal(_) | ProcessExit::TimedOut => {
            return Outcome::IndeterminateFailure { exit }.into();
        }
    };

    if code != 0 {
        return Outcome::failure(format!("process failed with exit code {}, see log", code))
            .into();
    }

    let Some(record) = record else {
        return Outcome::failure(NO_VALID_JSON).into();
    };

    let message = match record.parse() {
        Ok(message) => message,
        Err(e) => return Outcome::failure(format!("invalid result record: {}", e)).into(),
    };

    let content = message.text().unwrap_or_default().to_string();
    if message.is_success() {
        return Outcome::Success { content }.into();
    }

    let reason = format!("agent finished with subtype '{}'", message.subtype);
    match policy {
        SubtypePolicy::Strict => Outcome::failure(reason).into(),
        SubtypePolicy::Lenient => Classification {
            outcome: Outcome::Success { content },
            warning: Some(reason),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS_LINE: &str =
        r#"{"subtype":"success","message":{"content":[{"text":"ok"}]}}"#;

    fn record(line: &str) -> ResultRecord {
        ResultRecord::from_line(line).unwrap()
    }

    #[test]
    fn test_success_with_content() {
        let verdict = classify(
            ProcessExit::Code(0),
            Some(&record(SUCCESS_LINE)),
            SubtypePolicy::Strict,
        );
        assert_eq!(
            verdict.outcome,
            Outcome::Success {
                content: "ok".to_string()
            }
        );
        assert!(verdict.warning.is_none());
    }

    #[test]
    fn test_success_without_text_is_empty_content() {
        let verdict = classify(
            ProcessExit::Code(0),
            Some(&record(r#"{"subtype":"success"}"#)),
            SubtypePolicy::Strict,
        );
        assert_eq!(
            verdict.outcome,
            Outcome::Success {
                content: String::new()
            }
        );
    }

    #[test]
    fn test_nonzero_exit_dominates_valid_record() {
        let verdict = classify(
            ProcessExit::Code(7),
            Some(&record(SUCCESS_LINE)),
            SubtypePolicy::Lenient,
        );
        match verdict.outcome {
            Outcome::Failure { reason } => assert!(reason.contains("exit code 7")),
            other => panic!("expected Failure, got {:?}", other),
        }
    }

    #[test]
    fn test_exit_zero_without_record() {
        let verdict = classify(ProcessExit::Code(0), None, SubtypePolicy::Strict);
        assert_eq!(
            verdict.outcome,
            Outcome::Failure {
                reason: NO_VALID_JSON.to_string()
            }
        );
    }

    #[test]
    fn test_unparseable_record_reports_diagnostic() {
        let verdict = classify(
            ProcessExit::Code(0),
            Some(&record(r#"{"type":"assistant"}"#)),
            SubtypePolicy::Strict,
        );
        match verdict.outcome {
            Outcome::Failure { reason } => assert!(reason.contains("missing field `subtype`")),
            other => panic!("expected Failure, got {:?}", other),
        }
    }

    #[test]
    fn test_non_success_subtype_strict_fails() {
        let verdict = classify(
            ProcessExit::Code(0),
            Some(&record(r#"{"subtype":"error_max_turns"}"#)),
            SubtypePolicy::Strict,
        );
        assert!(!verdict.outcome.is_success());
        assert!(verdict.warning.is_none());
    }

    #[test]
    fn test_non_success_subtype_lenient_warns() {
        let verdict = classify(
            ProcessExit::Code(0),
            Some(&record(
                r#"{"subtype":"error_during_execution","message":{"content":[{"text":"partial"}]}}"#,
            )),
            SubtypePolicy::Lenient,
        );
        assert_eq!(
            verdict.outcome,
            Outcome::Success {
                content: "partial".to_string()
            }
        );
        assert!(verdict.warning.unwrap().contains("error_during_execution"));
    }

    #[test]
    fn test_signal_and_timeout_are_indeterminate() {
        for exit in [ProcessExit::Signal(9), ProcessExit::TimedOut] {
            let verdict = classify(exit, Some(&record(SUCCESS_LINE)), SubtypePolicy::Strict);
            assert_eq!(verdict.outcome, Outcome::IndeterminateFailure { exit });
            assert_eq!(verdict.outcome.conclusion(), "indeterminate_failure");
        }
    }
}
