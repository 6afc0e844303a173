//! Input resolution.
//!
//! Each prompt-like input can be given literally (`prompt`) or as a path
//! (`prompt_file`), never both. Conflicts are detected before any file is
//! read.

use std::path::Path;

use agentrun_core::{ConfigurationError, TaskRequest};
use agentrun_sdk::AgentEnvironment;
use tracing::debug;

use crate::config::{Config, MODEL_SELECTION};
use crate::host::HostEnvironment;

pub const PROMPT: &str = "prompt";
pub const SYSTEM_PROMPT: &str = "system_prompt";
pub const USER_ID: &str = "user_id";
pub const MACHINE_ID: &str = "machine_id";
pub const API_KEY: &str = "api_key";
pub const AUX_TOKEN: &str = "aux_token";
pub const SETTINGS: &str = "settings";
pub const EXTRA_ARGS: &str = "extra_args";

/// Everything read from the host before launch.
#[derive(Debug)]
pub struct TaskInputs {
    pub request: TaskRequest,
    pub environment: AgentEnvironment,
    /// Raw settings JSON, not yet validated.
    pub settings: Option<String>,
}

/// Resolve one logical input from its literal and `_file` sources.
///
/// Returns `Ok(None)` for an absent optional input.
pub fn resolve_input(
    host: &dyn HostEnvironment,
    name: &str,
    required: bool,
) -> Result<Option<String>, ConfigurationError> {
    let literal = host.input(name);
    let path = host.input(&format!("{}_file", name));

    match (literal, path) {
        (Some(_), Some(_)) => Err(ConfigurationError::ConflictingInput {
            name: name.to_string(),
        }),
        (Some(literal), None) => Ok(Some(literal)),
        (None, Some(path)) => read_input_file(name, Path::new(&path)).map(Some),
        (None, None) if required => Err(ConfigurationError::MissingInput {
            name: name.to_string(),
        }),
        (None, None) => Ok(None),
    }
}

fn read_input_file(name: &str, path: &Path) -> Result<String, ConfigurationError> {
    debug!(input = %name, path = %path.display(), "Reading input from file");
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigurationError::FileNotFound {
                name: name.to_string(),
                path: path.to_path_buf(),
            }
        } else {
            ConfigurationError::Unreadable {
                name: name.to_string(),
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Read all task inputs from `host`.
pub fn resolve_task(
    host: &dyn HostEnvironment,
    config: &Config,
) -> Result<TaskInputs, ConfigurationError> {
    let prompt = resolve_input(host, PROMPT, true)?.unwrap_or_default();
    if prompt.trim().is_empty() {
        return Err(ConfigurationError::MissingInput {
            name: PROMPT.to_string(),
        });
    }
    let system_prompt = resolve_input(host, SYSTEM_PROMPT, false)?.unwrap_or_default();

    let extra_args = match host.input(EXTRA_ARGS) {
        Some(raw) => shell_words::split(&raw).map_err(|e| ConfigurationError::InvalidInput {
            name: EXTRA_ARGS.to_string(),
            reason: e.to_string(),
        })?,
        None => Vec::new(),
    };

    let request = TaskRequest::new(prompt, config.working_dir.clone())
        .with_system_prompt(system_prompt)
        .with_extra_args(extra_args);

    let environment = AgentEnvironment::new(
        host.input(USER_ID).unwrap_or_default(),
        host.input(MACHINE_ID).unwrap_or_default(),
        MODEL_SELECTION,
    )
    .with_api_key(host.input(API_KEY))
    .with_aux_token(host.input(AUX_TOKEN));

    Ok(TaskInputs {
        request,
        environment,
        settings: host.input(SETTINGS),
    })
}
