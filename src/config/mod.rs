//! Configuration for the cutover core.
//!
//! All tunables live in one deserialized tree: database pool settings,
//! SSH connection behavior (including the host key policy, which has no
//! default on purpose), HTTP session behavior, and event channel sizing.
//! [`ConfigManager`] layers YAML files and `CUTOVER_`-prefixed environment
//! variables.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::http_session::HttpSessionSettings;
use crate::remote::{HostKeyPolicy, SshAuth, SshExecutorFactory};

pub use loader::ConfigManager;

/// Errors raised while loading or interpreting configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("configuration load failed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("ssh host key policy must be chosen explicitly (accept_any or fingerprints)")]
    MissingHostKeyPolicy,

    #[error("ssh credentials incomplete: set password or key_file")]
    MissingSshCredentials,
}

/// Root configuration tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CutoverConfig {
    pub database: DatabaseSettings,
    pub ssh: SshSettings,
    pub http: HttpSettings,
    pub events: EventSettings,
}

/// Database connection and pooling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub pool: u32,
    pub acquire_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/cutover".to_string(),
            pool: 5,
            acquire_timeout_ms: 5_000,
        }
    }
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

/// SSH behavior for remote command execution on application VMs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub key_file: Option<PathBuf>,
    pub key_passphrase: Option<String>,
    pub connect_timeout_ms: u64,
    pub auth_timeout_ms: u64,
    pub command_timeout_ms: u64,
    /// No default: accepting unverified host keys must be an explicit
    /// operator decision.
    pub host_key_policy: Option<HostKeyPolicy>,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: 22,
            username: "cutover".to_string(),
            password: None,
            key_file: None,
            key_passphrase: None,
            connect_timeout_ms: 10_000,
            auth_timeout_ms: 10_000,
            command_timeout_ms: 60_000,
            host_key_policy: None,
        }
    }
}

impl SshSettings {
    /// The configured host key policy, required explicitly.
    pub fn host_key_policy(&self) -> Result<&HostKeyPolicy, ConfigurationError> {
        self.host_key_policy
            .as_ref()
            .ok_or(ConfigurationError::MissingHostKeyPolicy)
    }

    /// Credential material, preferring key files over passwords when both
    /// are present.
    pub fn auth(&self) -> Result<SshAuth, ConfigurationError> {
        if let Some(path) = &self.key_file {
            return Ok(SshAuth::KeyFile {
                path: path.clone(),
                passphrase: self.key_passphrase.clone(),
            });
        }
        if let Some(password) = &self.password {
            return Ok(SshAuth::Password(password.clone()));
        }
        Err(ConfigurationError::MissingSshCredentials)
    }

    /// Build the factory that connects per-VM command runners.
    pub fn executor_factory(&self) -> Result<SshExecutorFactory, ConfigurationError> {
        Ok(SshExecutorFactory {
            port: self.port,
            username: self.username.clone(),
            auth: self.auth()?,
            policy: self.host_key_policy()?.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            auth_timeout: Duration::from_millis(self.auth_timeout_ms),
            command_timeout: Duration::from_millis(self.command_timeout_ms),
        })
    }
}

/// HTTP behavior for application session clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub scheme: String,
    pub app_port: u16,
    pub timeout_ms: u64,
    pub username: String,
    pub password: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            app_port: 8080,
            timeout_ms: 30_000,
            username: "admin".to_string(),
            password: String::new(),
        }
    }
}

impl HttpSettings {
    pub fn session_settings(&self) -> HttpSessionSettings {
        HttpSessionSettings {
            timeout: Duration::from_millis(self.timeout_ms),
            ..HttpSessionSettings::default()
        }
    }

    /// Base URI for one application's lifecycle endpoints.
    pub fn base_uri_for(&self, hostname: &str) -> String {
        format!("{}://{}:{}/", self.scheme, hostname, self.app_port)
    }
}

/// Event channel sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    pub channel_capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable_except_explicit_choices() {
        let config = CutoverConfig::default();
        assert_eq!(config.ssh.port, 22);
        assert!(config.ssh.host_key_policy().is_err());
        assert!(config.ssh.auth().is_err());
        assert_eq!(config.http.base_uri_for("app.internal"), "http://app.internal:8080/");
    }

    #[test]
    fn test_auth_prefers_key_file() {
        let settings = SshSettings {
            password: Some("secret".to_string()),
            key_file: Some(PathBuf::from("/etc/cutover/id_ed25519")),
            ..SshSettings::default()
        };
        assert!(matches!(settings.auth().unwrap(), SshAuth::KeyFile { .. }));
    }

    #[test]
    fn test_executor_factory_requires_policy() {
        let settings = SshSettings {
            password: Some("secret".to_string()),
            ..SshSettings::default()
        };
        assert!(matches!(
            settings.executor_factory().unwrap_err(),
            ConfigurationError::MissingHostKeyPolicy
        ));

        let settings = SshSettings {
            password: Some("secret".to_string()),
            host_key_policy: Some(HostKeyPolicy::AcceptAny),
            ..SshSettings::default()
        };
        assert!(settings.executor_factory().is_ok());
    }
}
