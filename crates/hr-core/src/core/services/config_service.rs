//! Configuration service for managing application configuration

use crate::AppError;
use crate::error::ConfigError;
use crate::storage::config::{ANON_KEY_ENV, Config, URL_ENV};
use crate::utils::validation::validate_url;
use std::path::PathBuf;

/// Backend endpoint and public key needed to build a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub url: String,
    pub anon_key: String,
}

/// Configuration service for managing application configuration
pub struct ConfigService {
    config: Config,
    path: Option<PathBuf>,
}

impl ConfigService {
    /// `path` of `None` means the default config location.
    pub fn new(config: Config, path: Option<PathBuf>) -> Self {
        Self { config, path }
    }

    pub fn load(path: Option<PathBuf>) -> Result<Self, AppError> {
        let config = Config::load(path.clone())?;
        Ok(Self::new(config, path))
    }

    pub fn get_url(&self) -> Option<String> {
        self.config.get_url()
    }

    pub fn get_anon_key(&self) -> Option<String> {
        self.config.get_anon_key()
    }

    /// Trailing slashes are dropped so paths can be appended.
    pub fn set_url(&mut self, url: &str) -> Result<(), AppError> {
        let url = url.trim().trim_end_matches('/');
        validate_url(url)?;
        self.config.set_url(url.to_string());
        Ok(())
    }

    pub fn set_anon_key(&mut self, anon_key: &str) -> Result<(), AppError> {
        let anon_key = anon_key.trim();
        if anon_key.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "anon_key".to_string(),
                value: String::new(),
                reason: "anon key cannot be empty".to_string(),
            }
            .into());
        }
        self.config.set_anon_key(anon_key.to_string());
        Ok(())
    }

    pub fn save(&self) -> Result<(), AppError> {
        self.config.save(self.path.clone()).map_err(|e| e.into())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// URL and anon key, or the first missing one with a hint on how to set it.
    pub fn connection(&self) -> Result<Connection, AppError> {
        let url = self.get_url().ok_or_else(|| ConfigError::MissingField {
            field: "url".to_string(),
            hint: format!("Run `hr-cli config set --url <URL>` or set {}", URL_ENV),
        })?;
        let anon_key = self.get_anon_key().ok_or_else(|| ConfigError::MissingField {
            field: "anon_key".to_string(),
            hint: format!("Run `hr-cli config set --anon-key <KEY>` or set {}", ANON_KEY_ENV),
        })?;
        Ok(Connection { url, anon_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn configured() -> Config {
        Config {
            url: Some("https://proj.example.test".to_string()),
            anon_key: Some("anon".to_string()),
        }
    }

    #[test]
    fn test_set_url_validates_and_normalizes() {
        let mut service = ConfigService::new(configured(), None);

        assert!(service.set_url("proj.example.test").is_err());
        service.set_url(" https://other.example.test/ ").unwrap();
        assert_eq!(
            service.get_url(),
            Some("https://other.example.test".to_string())
        );
    }

    #[test]
    fn test_set_anon_key_rejects_blank() {
        let mut service = ConfigService::new(configured(), None);
        let err = service.set_anon_key("  ").unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::InvalidValue { .. })));
        assert_eq!(service.get_anon_key(), Some("anon".to_string()));
    }

    #[test]
    fn test_connection_from_stored_values() {
        let service = ConfigService::new(configured(), None);
        assert_eq!(
            service.connection().unwrap(),
            Connection {
                url: "https://proj.example.test".to_string(),
                anon_key: "anon".to_string(),
            }
        );
    }

    #[test]
    fn test_connection_missing_anon_key_has_hint() {
        let original = std::env::var(ANON_KEY_ENV).ok();
        unsafe {
            std::env::remove_var(ANON_KEY_ENV);
        }

        let service = ConfigService::new(
            Config {
                url: Some("https://proj.example.test".to_string()),
                anon_key: None,
            },
            None,
        );
        let err = service.connection().unwrap_err();
        assert!(err.troubleshooting_hint().unwrap().contains("--anon-key"));

        unsafe {
            if let Some(value) = original {
                std::env::set_var(ANON_KEY_ENV, value);
            }
        }
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = Config::file_in(temp_dir.path());

        let mut service = ConfigService::new(Config::default(), Some(path.clone()));
        service.set_url("http://localhost:54321").unwrap();
        service.set_anon_key("local-anon").unwrap();
        service.save().unwrap();

        let reloaded = ConfigService::load(Some(path)).unwrap();
        assert_eq!(reloaded.config(), service.config());
    }
}
