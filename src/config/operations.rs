//! Config loading, validation, and worker-command helpers.

use super::model::SupervisorConfig;
use crate::error::{Result, WardenError};
use std::path::Path;
use std::time::Duration;

impl SupervisorConfig {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(SupervisorConfig)` - Successfully loaded and validated config
    /// * `Err(WardenError::UserError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            WardenError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load from `path` if given and present, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as null, not as an empty mapping.
        let config: SupervisorConfig = if yaml.trim().is_empty() {
            SupervisorConfig::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                WardenError::UserError(format!("failed to parse config YAML: {}", e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| WardenError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `stop_grace_seconds` must be positive
    /// - `monitor_poll_ms` must be positive
    /// - `worker_command` must parse to at least one word
    /// - `agent_dir_name` must be a single non-empty path component
    pub fn validate(&self) -> Result<()> {
        if self.stop_grace_seconds == 0 {
            return Err(WardenError::UserError(
                "config validation failed: stop_grace_seconds must be greater than 0".to_string(),
            ));
        }

        if self.monitor_poll_ms == 0 {
            return Err(WardenError::UserError(
                "config validation failed: monitor_poll_ms must be greater than 0".to_string(),
            ));
        }

        self.worker_argv()?;

        if self.agent_dir_name.is_empty()
            || self.agent_dir_name.contains('/')
            || self.agent_dir_name == ".."
        {
            return Err(WardenError::UserError(format!(
                "config validation failed: agent_dir_name must be a single directory name (found '{}')",
                self.agent_dir_name
            )));
        }

        Ok(())
    }

    /// The worker program and its leading arguments.
    pub fn worker_argv(&self) -> Result<Vec<String>> {
        let argv = shell_words::split(&self.worker_command).map_err(|e| {
            WardenError::UserError(format!(
                "config validation failed: worker_command '{}' could not be parsed: {}",
                self.worker_command, e
            ))
        })?;
        if argv.is_empty() {
            return Err(WardenError::UserError(
                "config validation failed: worker_command must not be empty".to_string(),
            ));
        }
        Ok(argv)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_seconds)
    }

    pub fn monitor_poll(&self) -> Duration {
        Duration::from_millis(self.monitor_poll_ms)
    }
}
