//! Registry configuration.
//!
//! ## Learning: Serde for Serialization
//!
//! `#[serde(default)]` on every struct means a config file only has to
//! mention what it changes. A missing `[catalogs]` table still yields the
//! user catalog directory and the `text` fallback mode.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-user directory under the platform config dir.
const APP_DIR: &str = "modekit";

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where mode catalogs come from
    pub catalogs: CatalogConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads config from the default location.
    pub fn load() -> Self {
        Self::load_from_default_path().unwrap_or_else(|e| {
            tracing::warn!("Falling back to default config: {}", e);
            Self::default()
        })
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads from the default config path.
    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_DIR).join("config.toml"))
    }

    /// Returns the directory holding the user's own catalog.
    pub fn user_modes_dir() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_DIR).join("modes"))
    }

    /// Saves the config to the default location and returns that path.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Saves the config to a file, creating its directory.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// The config as TOML text.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Catalog directories in load order.
    ///
    /// The user directory goes last: a mode loaded later replaces an earlier
    /// one with the same name, so user modes override system modes.
    pub fn catalog_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = self.catalogs.directories.clone();
        if self.catalogs.include_user_dir {
            match Self::user_modes_dir() {
                Ok(user) if !dirs.contains(&user) => dirs.push(user),
                Ok(_) => {}
                Err(e) => tracing::debug!("No user catalog directory: {}", e),
            }
        }
        dirs
    }
}

/// Catalog sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog directories, each holding a `catalog.toml`
    pub directories: Vec<PathBuf>,

    /// Append the per-user modes directory
    pub include_user_dir: bool,

    /// Reload when a catalog directory changes
    pub watch: bool,

    /// Mode used when nothing accepts a file
    pub fallback_mode: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            include_user_dir: true,
            watch: false,
            fallback_mode: "text".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level: error, warn, info, debug or trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Parses the configured level, defaulting to WARN on garbage.
    pub fn tracing_level(&self) -> tracing::Level {
        self.level.parse().unwrap_or(tracing::Level::WARN)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.catalogs.directories.is_empty());
        assert!(config.catalogs.include_user_dir);
        assert!(!config.catalogs.watch);
        assert_eq!(config.catalogs.fallback_mode, "text");
        assert_eq!(config.logging.tracing_level(), tracing::Level::WARN);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.catalogs.directories.push(PathBuf::from("/usr/share/modekit/modes"));
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.catalogs.directories, config.catalogs.directories);
    }

    #[test]
    fn test_partial_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[catalogs]\ndirectories = [\"/opt/modes\"]\ninclude_user_dir = false\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.catalog_dirs(), vec![PathBuf::from("/opt/modes")]);
        assert_eq!(config.catalogs.fallback_mode, "text");
    }

    #[test]
    fn test_save_to_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.catalogs.watch = true;
        config.catalogs.fallback_mode = "plain".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(loaded.catalogs.watch);
        assert_eq!(loaded.catalogs.fallback_mode, "plain");
    }

    #[test]
    fn test_bad_log_level_falls_back() {
        let logging = LoggingConfig {
            level: "chatty".to_string(),
        };
        assert_eq!(logging.tracing_level(), tracing::Level::WARN);
    }
}
