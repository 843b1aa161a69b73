use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Emitter configuration
///
/// Parsed from JSONC, JSON or YAML with [`EmitterConfig::parse`] or
/// [`EmitterConfig::from_path`].
///
/// # Example
///
/// ```yaml
/// event_names: [create, update]
/// max_listeners: 10
/// enforce_limit: true
/// failure_policy: collect
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitterConfig {
    /// Declared event names. Advisory only, any name can be registered.
    #[serde(default)]
    pub event_names: Vec<String>,

    /// Upper bound on listeners per event (default: unbounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_listeners: Option<usize>,

    /// Fail registrations past `max_listeners` instead of warning (default: false)
    #[serde(default)]
    pub enforce_limit: bool,

    /// What `emit` does when a listener fails (default: propagate)
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl EmitterConfig {
    pub fn settings(&self) -> EmitterSettings {
        EmitterSettings {
            max_listeners: self.max_listeners,
            enforce_limit: self.enforce_limit,
            failure_policy: self.failure_policy,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings().validate()
    }
}

/// How an emission reacts to a failing listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Return the first failure and skip the remaining listeners
    #[default]
    Propagate,
    /// Run every listener, then report all failures together
    Collect,
}

/// Limit and failure settings of a single emitter, without the declared names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmitterSettings {
    pub max_listeners: Option<usize>,
    pub enforce_limit: bool,
    pub failure_policy: FailurePolicy,
}

impl EmitterSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_listeners(mut self, max: usize) -> Self {
        self.max_listeners = Some(max);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.max_listeners = None;
        self
    }

    pub fn enforce_limit(mut self, enforce: bool) -> Self {
        self.enforce_limit = enforce;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_listeners == Some(0) {
            return Err(ConfigError::InvalidMaxListeners);
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_listeners must be positive (omit it for unbounded)")]
    InvalidMaxListeners,
}
