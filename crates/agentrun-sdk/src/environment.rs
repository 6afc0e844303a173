//! Environment overlay passed to the agent process.

use std::fmt;

/// User identity, exported under two names read by different agent versions.
pub const ENV_USER_ID: &str = "AGENT_USER_ID";
pub const ENV_USER_EMAIL: &str = "AGENT_USER_EMAIL";
/// Machine identity.
pub const ENV_MACHINE_ID: &str = "AGENT_MACHINE_ID";
/// Model selection.
pub const ENV_MODEL: &str = "AGENT_MODEL";
/// API credential, only set when supplied.
pub const ENV_API_KEY: &str = "AGENT_API_KEY";
/// Auxiliary token, only set when supplied.
pub const ENV_AUX_TOKEN: &str = "AGENT_AUX_TOKEN";

/// Variables layered over the inherited host environment.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AgentEnvironment {
    user_id: String,
    machine_id: String,
    model: String,
    api_key: Option<String>,
    aux_token: Option<String>,
}

impl AgentEnvironment {
    /// Create an overlay with the always-present identity and model fields.
    pub fn new(
        user_id: impl Into<String>,
        machine_id: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            machine_id: machine_id.into(),
            model: model.into(),
            api_key: None,
            aux_token: None,
        }
    }

    /// Set the API credential. `None` and empty strings leave it unset.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    /// Set the auxiliary token. `None` and empty strings leave it unset.
    pub fn with_aux_token(mut self, aux_token: Option<String>) -> Self {
        self.aux_token = aux_token.filter(|t| !t.is_empty());
        self
    }

    /// Whether a credential will be injected.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Key/value pairs to set on the child, in a stable order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            (ENV_USER_ID, self.user_id.clone()),
            (ENV_USER_EMAIL, self.user_id.clone()),
            (ENV_MACHINE_ID, self.machine_id.clone()),
            (ENV_MODEL, self.model.clone()),
        ];
        if let Some(key) = &self.api_key {
            entries.push((ENV_API_KEY, key.clone()));
        }
        if let Some(token) = &self.aux_token {
            entries.push((ENV_AUX_TOKEN, token.clone()));
        }
        entries
    }
}

impl fmt::Debug for AgentEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentEnvironment")
            .field("user_id", &self.user_id)
            .field("machine_id", &self.machine_id)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("aux_token", &self.aux_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
