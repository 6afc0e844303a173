//! The calling workflow's input/output variable system.
//!
//! Inputs arrive as `INPUT_<NAME>` environment variables, outputs are
//! appended to the file named by `GITHUB_OUTPUT`, and failures and warnings
//! are announced with `::error::` and `::warning::` workflow commands.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use tracing::{info, warn};
use uuid::Uuid;

/// Opaque key→string getter/setter provided by the calling environment.
pub trait HostEnvironment {
    /// Value of input `name`. Unset and empty inputs are both `None`.
    fn input(&self, name: &str) -> Option<String>;

    /// Publish output `name`.
    fn set_output(&mut self, name: &str, value: &str) -> std::io::Result<()>;

    /// Mark the run as failed with a user-visible message.
    fn set_failed(&mut self, message: &str);

    /// Surface a non-fatal warning to the user.
    fn warning(&mut self, message: &str);
}

/// GitHub-Actions-compatible host environment.
#[derive(Debug, Default)]
pub struct WorkflowEnvironment {
    vars: HashMap<String, String>,
    output_file: Option<PathBuf>,
}

impl WorkflowEnvironment {
    /// Snapshot the current process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build from an explicit set of variables.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let output_file = vars
            .get("GITHUB_OUTPUT")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Self { vars, output_file }
    }
}

fn input_key(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

/// Escape a message for a single-line workflow command.
fn escape_command_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

impl HostEnvironment for WorkflowEnvironment {
    fn input(&self, name: &str) -> Option<String> {
        self.vars
            .get(&input_key(name))
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }

    fn set_output(&mut self, name: &str, value: &str) -> std::io::Result<()> {
        let Some(path) = &self.output_file else {
            warn!(output = %name, "GITHUB_OUTPUT is not set, output only logged");
            info!(output = %name, value_len = value.len(), "Output");
            return Ok(());
        };

        let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        write!(file, "{name}<<{delimiter}\n{value}\n{delimiter}\n")?;
        Ok(())
    }

    fn set_failed(&mut self, message: &str) {
        println!("{}", workflow_command("error", message));
    }

    fn warning(&mut self, message: &str) {
        println!("{}", workflow_command("warning", message));
    }
}

fn workflow_command(command: &str, message: &str) -> String {
    format!("::{}::{}", command, escape_command_data(message))
}

/// In-memory host environment for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryEnvironment {
    pub inputs: HashMap<String, String>,
    pub outputs: HashMap<String, String>,
    pub failure: Option<String>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
impl MemoryEnvironment {
    pub fn with_input(mut self, name: &str, value: impl Into<String>) -> Self {
        self.inputs.insert(name.to_string(), value.into());
        self
    }
}

#[cfg(test)]
impl HostEnvironment for MemoryEnvironment {
    fn input(&self, name: &str) -> Option<String> {
        self.inputs.get(name).filter(|v| !v.trim().is_empty()).cloned()
    }

    fn set_output(&mut self, name: &str, value: &str) -> std::io::Result<()> {
        self.outputs.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn set_failed(&mut self, message: &str) {
        self.failure = Some(message.to_string());
    }

    fn warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_read_from_prefixed_vars() {
        let env = WorkflowEnvironment::from_vars([
            ("INPUT_PROMPT", "do the thing"),
            ("INPUT_SYSTEM_PROMPT", "   "),
            ("PATH", "/usr/bin"),
        ]);
        assert_eq!(env.input("prompt").as_deref(), Some("do the thing"));
        assert_eq!(env.input("system_prompt"), None);
        assert_eq!(env.input("api_key"), None);
    }

    #[test]
    fn test_outputs_appended_with_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output.txt");
        let mut env = WorkflowEnvironment::from_vars([(
            "GITHUB_OUTPUT",
            output.to_str().unwrap(),
        )]);

        env.set_output("conclusion", "success").unwrap();
        env.set_output("content", "line one\nline two").unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("conclusion<<ghadelimiter_"));
        assert_eq!(lines[1], "success");
        assert_eq!(lines[2], &lines[0]["conclusion<<".len()..]);
        assert!(lines[3].starts_with("content<<"));
        assert_eq!(lines[4], "line one");
        assert_eq!(lines[5], "line two");
    }

    #[test]
    fn test_outputs_without_file_are_not_an_error() {
        let mut env = WorkflowEnvironment::default();
        env.set_output("conclusion", "success").unwrap();
    }

    #[test]
    fn test_memory_environment_records_failure() {
        let mut env = MemoryEnvironment::default().with_input("prompt", "");
        assert_eq!(env.input("prompt"), None);

        env.set_failed("no valid JSON output");
        assert_eq!(env.failure.as_deref(), Some("no valid JSON output"));
    }

    #[test]
    fn test_escape_command_data() {
        assert_eq!(escape_command_data("100% done\nnext"), "100%25 done%0Anext");
    }

    #[test]
    fn test_workflow_commands_are_single_line() {
        assert_eq!(
            workflow_command("warning", "agent finished with subtype 'x'\nsee log"),
            "::warning::agent finished with subtype 'x'%0Asee log"
        );
        assert_eq!(workflow_command("error", "50%"), "::error::50%25");
    }
}
