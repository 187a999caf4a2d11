//! Configuration management
//!
//! Backend URL and anon key stored in a config file, with environment fallbacks.
//! Priority: CLI argument > config.toml > HR_URL / HR_ANON_KEY environment variables

use super::Result;
use crate::error::StorageError;
use dirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const URL_ENV: &str = "HR_URL";
pub const ANON_KEY_ENV: &str = "HR_ANON_KEY";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application configuration
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Backend project URL
    pub url: Option<String>,
    /// Public (anon) API key sent with every request
    pub anon_key: Option<String>,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::config_file_path()?,
        };

        if !config_path.exists() {
            log::debug!("No config file at {}", config_path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|source| StorageError::FileIo {
            path: config_path.to_string_lossy().to_string(),
            source,
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|e| StorageError::ConfigParseError {
                message: format!("Failed to parse config file: {}", e),
            })?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: Option<PathBuf>) -> Result<()> {
        let config_path = match path {
            Some(p) => p,
            None => Self::config_file_path()?,
        };

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::FileIo {
                path: parent.to_string_lossy().to_string(),
                source,
            })?;
        }

        let toml_content = toml::to_string(self).map_err(|e| StorageError::ConfigParseError {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(&config_path, toml_content).map_err(|source| StorageError::FileIo {
            path: config_path.to_string_lossy().to_string(),
            source,
        })?;

        Ok(())
    }

    /// Config file inside an explicit directory.
    pub fn file_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE_NAME)
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().ok_or(StorageError::ConfigDirNotFound)?;
        Ok(Self::file_in(&home_dir.join(".config").join("hr-cli")))
    }

    /// Get URL with fallback to environment variable
    pub fn get_url(&self) -> Option<String> {
        self.url.clone().or_else(|| env_value(URL_ENV))
    }

    pub fn set_url(&mut self, url: String) {
        self.url = Some(url);
    }

    /// Get anon key with fallback to environment variable
    pub fn get_anon_key(&self) -> Option<String> {
        self.anon_key.clone().or_else(|| env_value(ANON_KEY_ENV))
    }

    pub fn set_anon_key(&mut self, anon_key: String) {
        self.anon_key = Some(anon_key);
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.url.is_none());
        assert!(config.anon_key.is_none());
    }

    #[test]
    fn test_stored_values_win_over_environment() {
        let mut config = Config::default();
        config.set_url("https://proj.example.test".to_string());
        config.set_anon_key("anon-key".to_string());

        assert_eq!(config.get_url(), Some("https://proj.example.test".to_string()));
        assert_eq!(config.get_anon_key(), Some("anon-key".to_string()));
    }

    #[test]
    fn test_url_env_fallback() {
        let original = std::env::var(URL_ENV).ok();

        unsafe {
            std::env::set_var(URL_ENV, "https://env.example.test");
        }
        assert_eq!(
            Config::default().get_url(),
            Some("https://env.example.test".to_string())
        );

        unsafe {
            std::env::set_var(URL_ENV, "");
        }
        assert_eq!(Config::default().get_url(), None);

        // Restore original state
        unsafe {
            match original {
                Some(value) => std::env::set_var(URL_ENV, value),
                None => std::env::remove_var(URL_ENV),
            }
        }
    }

    #[test]
    fn test_config_load_save() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = Config::file_in(&temp_dir.path().join("nested"));

        let mut config = Config::default();
        config.set_url("https://proj.example.test".to_string());
        config.set_anon_key("anon-key".to_string());

        config
            .save(Some(config_path.clone()))
            .expect("Failed to save config");

        let loaded_config = Config::load(Some(config_path)).expect("Failed to load config");
        assert_eq!(loaded_config, config);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let nonexistent_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load(Some(nonexistent_path)).expect("Failed to load default config");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "url = [unterminated").expect("write failed");

        let err = Config::load(Some(path)).unwrap_err();
        assert!(matches!(err, StorageError::ConfigParseError { .. }));
    }
}
