//! Process configuration loaded once at startup
//!
//! Credentials and the storage root come from the environment (optionally
//! seeded from a `.env` file by `main`). The resulting `Config` is passed
//! explicitly into the components that need it, so the core stays testable
//! without mutating the process environment.

use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;
use thiserror::Error;

/// Salesforce username environment variable
const ENV_USERNAME: &str = "SF_USERNAME";
/// Salesforce password environment variable
const ENV_PASSWORD: &str = "SF_PASSWORD";
/// Salesforce security token environment variable
const ENV_SECURITY_TOKEN: &str = "SF_SECURITYTOKEN";
/// Optional override for the Salesforce login endpoint
const ENV_LOGIN_URL: &str = "SF_LOGIN_URL";
/// Optional override for the local data root
const ENV_DATA_HOME: &str = "SFEXTRACT_HOME";

/// Errors raised while assembling the startup configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is absent or empty
    #[error("missing required configuration value: {0}")]
    MissingValue(&'static str),

    /// No data root was configured and no platform data directory exists
    #[error("no data root: set {ENV_DATA_HOME} or run with a home directory")]
    NoDataRoot,
}

/// Startup configuration for the extraction pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// Salesforce username
    pub username: String,
    /// Salesforce password
    pub password: String,
    /// Salesforce API security token, appended to the password at login
    pub security_token: String,
    /// Base URL of the login endpoint
    pub login_url: String,
    /// Root directory for locally persisted data
    pub data_root: PathBuf,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Empty values count as missing. The data root falls back to the
    /// platform data directory when `SFEXTRACT_HOME` is unset; the login
    /// URL falls back to the production Salesforce endpoint.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            match lookup(key) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => Err(ConfigError::MissingValue(key)),
            }
        };

        let username = required(ENV_USERNAME)?;
        let password = required(ENV_PASSWORD)?;
        let security_token = required(ENV_SECURITY_TOKEN)?;
        let login_url = lookup(ENV_LOGIN_URL)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| crate::salesforce::DEFAULT_LOGIN_URL.to_string());
        let data_root = match lookup(ENV_DATA_HOME).filter(|value| !value.is_empty()) {
            Some(home) => PathBuf::from(home),
            None => ProjectDirs::from("", "", "sfextract")
                .ok_or(ConfigError::NoDataRoot)?
                .data_dir()
                .to_path_buf(),
        };

        Ok(Self {
            username,
            password,
            security_token,
            login_url,
            data_root,
        })
    }

    /// Directory under which per-dataset cache directories live
    pub fn cache_root(&self) -> PathBuf {
        self.data_root.join("cache")
    }
}
