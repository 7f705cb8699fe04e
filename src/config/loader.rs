use config::{Config, Environment, File};
use std::path::Path;
use tracing::info;

use super::{ConfigurationError, CutoverConfig};

/// Loads the configuration tree from layered sources: a base YAML file, an
/// environment-specific override, then `CUTOVER_`-prefixed environment
/// variables (`CUTOVER_SSH__PORT=2222` overrides `ssh.port`).
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: CutoverConfig,
    environment: String,
}

impl ConfigManager {
    /// Load configuration for the environment named by `CUTOVER_ENV`
    /// (default `development`). Missing files are fine; defaults cover
    /// everything except the explicit choices.
    pub fn load() -> Result<Self, ConfigurationError> {
        let environment =
            std::env::var("CUTOVER_ENV").unwrap_or_else(|_| "development".to_string());

        let settings = Config::builder()
            .add_source(File::with_name("config/cutover").required(false))
            .add_source(
                File::with_name(&format!("config/cutover-{environment}")).required(false),
            )
            .add_source(Environment::with_prefix("CUTOVER").separator("__"))
            .build()?;

        let config: CutoverConfig = settings.try_deserialize()?;
        info!(environment = %environment, "configuration loaded");
        Ok(Self {
            config,
            environment,
        })
    }

    /// Load from one explicit file, no layering. Used by tests and tools.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .build()?;
        let config: CutoverConfig = settings.try_deserialize()?;
        Ok(Self {
            config,
            environment: "explicit".to_string(),
        })
    }

    pub fn config(&self) -> &CutoverConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::HostKeyPolicy;
    use std::io::Write;

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
ssh:
  port: 2222
  username: deploy
  password: sekrit
  host_key_policy: accept_any
http:
  app_port: 9090
"#
        )
        .unwrap();

        let manager = ConfigManager::load_from_file(file.path()).unwrap();
        let config = manager.config();
        assert_eq!(config.ssh.port, 2222);
        assert_eq!(config.ssh.username, "deploy");
        assert_eq!(
            config.ssh.host_key_policy().unwrap(),
            &HostKeyPolicy::AcceptAny
        );
        assert_eq!(config.http.app_port, 9090);
        // untouched sections fall back to defaults
        assert_eq!(config.database.pool, 5);
    }

    #[test]
    fn test_fingerprint_policy_from_yaml() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
ssh:
  host_key_policy:
    fingerprints:
      - "SHA256:abcdef"
"#
        )
        .unwrap();

        let manager = ConfigManager::load_from_file(file.path()).unwrap();
        assert_eq!(
            manager.config().ssh.host_key_policy().unwrap(),
            &HostKeyPolicy::Fingerprints(vec!["SHA256:abcdef".to_string()])
        );
    }
}
