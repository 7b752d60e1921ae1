//! Engine configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! copy_poll_interval_secs = 10
//! sas_validity_hours = 24
//! blob_suffix_range = 10000
//! log_format = "json"
//! post_deployment_check = true
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;

/// Environment variable naming a config file when no path is given
pub const CONFIG_ENV_VAR: &str = "AZMOVE_CONFIG";

/// Tunables of a migration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Seconds between disk copy status polls
    pub copy_poll_interval_secs: u64,
    /// Validity of the snapshot read grant
    pub sas_validity_hours: i64,
    /// Exclusive upper bound of the random suffix added to colliding blob names
    pub blob_suffix_range: u32,
    pub log_format: LogFormat,
    /// Fetch the VM after deployment and report its provisioning state
    pub post_deployment_check: bool,
}

impl MigrationConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`, or from `$AZMOVE_CONFIG`, or fall back to defaults
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR);
        let resolved = path.or(env_path.as_deref().map(Path::new));
        let Some(resolved) = resolved else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(resolved).map_err(|err| ConfigError::Io {
            path: resolved.display().to_string(),
            reason: err.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns [`ConfigError::Invalid`] for zero intervals or ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.copy_poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("copy_poll_interval_secs must be positive".into()));
        }
        if self.sas_validity_hours <= 0 {
            return Err(ConfigError::Invalid("sas_validity_hours must be positive".into()));
        }
        if self.blob_suffix_range == 0 {
            return Err(ConfigError::Invalid("blob_suffix_range must be positive".into()));
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn copy_poll_interval(&self) -> Duration {
        Duration::from_secs(self.copy_poll_interval_secs)
    }

    #[inline]
    #[must_use]
    pub fn sas_validity(&self) -> chrono::Duration {
        chrono::Duration::hours(self.sas_validity_hours)
    }

    #[inline]
    #[must_use]
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.copy_poll_interval_secs = secs;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_post_deployment_check(mut self, enabled: bool) -> Self {
        self.post_deployment_check = enabled;
        self
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            copy_poll_interval_secs: 10,
            sas_validity_hours: 24,
            blob_suffix_range: 10_000,
            log_format: LogFormat::Pretty,
            post_deployment_check: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {reason}")]
    Io { path: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}
