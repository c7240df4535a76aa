//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML configuration without validating it.
pub fn parse_config(content: &str) -> Result<GuardConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Values supplied outside the config file, applied before validation.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub security_key: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut GuardConfig) {
        if let Some(key) = &self.security_key {
            config.security.security_key = key.clone();
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GuardConfig, ConfigError> {
    load_config_with(path, &ConfigOverrides::default())
}

/// Load configuration, apply `overrides`, then validate.
pub fn load_config_with(path: &Path, overrides: &ConfigOverrides) -> Result<GuardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    overrides.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::KeyStoreConfig;

    #[test]
    fn test_load_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"
[listener]
bind_address = "127.0.0.1:8080"

[upstream]
address = "127.0.0.1:8888"

[security]
security_key = "MY_SECURE_KEY"
stores_crypto_key_for_each_image = true
key_store = { kind = "filesystem", root_path = "/var/lib/thumbor/storage" }
"#,
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.security.security_key, "MY_SECURE_KEY");
        assert_eq!(config.security.key_lookup_timeout_ms, 500);
        assert_eq!(
            config.security.key_store,
            Some(KeyStoreConfig::Filesystem {
                root_path: "/var/lib/thumbor/storage".into()
            })
        );
        assert_eq!(config.timeouts.request_secs, 30);
    }

    #[test]
    fn test_load_rejects_invalid_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[security]\nsecurity_key = \"\"\n").unwrap();

        match load_config(file.path()) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors, vec![ValidationError::EmptySecurityKey]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_override_satisfies_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[upstream]\naddress = \"thumbor:8888\"\n").unwrap();

        let overrides = ConfigOverrides {
            security_key: Some("FROM_ENV".into()),
        };
        let config = load_config_with(file.path(), &overrides).unwrap();

        assert_eq!(config.security.security_key, "FROM_ENV");
        assert_eq!(config.upstream.address, "thumbor:8888");
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_config("[security"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/guard.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
