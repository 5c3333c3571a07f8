//! Configuration for voicegate.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

/// Main configuration, one section per subsystem.
#[derive(Debug, Clone)]
pub struct Config {
    pub control: ControlConfig,
    pub store: StoreConfig,
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            control: ControlConfig::from_env()?,
            store: StoreConfig::from_env()?,
            sync: SyncConfig::from_env()?,
        })
    }
}

/// Control-service configuration.
#[derive(Debug, Clone)]
pub struct ControlConfig {
    pub host: String,
    pub port: u16,
    /// Shared secret callers present as the first URL path segment.
    /// Generated (and logged) at startup when unset.
    pub secret: Option<SecretString>,
}

impl ControlConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: optional_env("CONTROL_HOST")?.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: optional_env("CONTROL_PORT")?
                .map(|s| s.parse())
                .transpose()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "CONTROL_PORT".to_string(),
                    message: format!("must be a valid port number: {e}"),
                })?
                .unwrap_or(9999),
            secret: optional_env("CONTROL_SECRET")?.map(SecretString::from),
        })
    }
}

/// Voice-server bridge endpoint.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
}

impl StoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: optional_env("MURMUR_HOST")?.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: optional_env("MURMUR_PORT")?
                .map(|s| s.parse())
                .transpose()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "MURMUR_PORT".to_string(),
                    message: format!("must be a valid port number: {e}"),
                })?
                .unwrap_or(6502),
        })
    }
}

/// Sync-agent configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the control service.
    pub control_url: String,
    /// Shared secret; falls back to CONTROL_SECRET so one .env can drive
    /// both subcommands.
    pub secret: Option<SecretString>,
    /// Poll interval for the desired-channel attribute.
    pub interval: Duration,
    /// File the world server writes the desired channel id to.
    pub attribute_file: Option<PathBuf>,
}

impl SyncConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            control_url: optional_env("SYNC_CONTROL_URL")?
                .unwrap_or_else(|| "http://127.0.0.1:9999".to_string()),
            secret: optional_env("SYNC_SECRET")?
                .or(optional_env("CONTROL_SECRET")?)
                .map(SecretString::from),
            interval: Duration::from_millis(parse_optional_env("SYNC_INTERVAL_MS", 500)?),
            attribute_file: optional_env("SYNC_ATTRIBUTE_FILE")?.map(PathBuf::from),
        })
    }

    /// Base URL for channel-creation calls. The shared secret rides in the
    /// path; that is the whole of the control service's authentication.
    pub fn create_base_url(&self, secret: &SecretString) -> String {
        format!(
            "{}/{}/CREATE_CHANNEL/",
            self.control_url.trim_end_matches('/'),
            secret.expose_secret()
        )
    }

    /// Base URL for channel-removal calls.
    pub fn remove_base_url(&self, secret: &SecretString) -> String {
        format!(
            "{}/{}/REMOVE_CHANNEL/",
            self.control_url.trim_end_matches('/'),
            secret.expose_secret()
        )
    }
}

// Helper functions

fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}

fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_urls_embed_the_secret() {
        let sync = SyncConfig {
            control_url: "http://127.0.0.1:9999/".to_string(),
            secret: None,
            interval: Duration::from_millis(500),
            attribute_file: None,
        };
        let secret = SecretString::from("qwerty123".to_string());
        assert_eq!(
            sync.create_base_url(&secret),
            "http://127.0.0.1:9999/qwerty123/CREATE_CHANNEL/"
        );
        assert_eq!(
            sync.remove_base_url(&secret),
            "http://127.0.0.1:9999/qwerty123/REMOVE_CHANNEL/"
        );
    }
}
