//! Configuration management for recipebox.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "recipebox";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "recipes.db";

/// Default image directory name, inside the data directory.
const MEDIA_DIR_NAME: &str = "images";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `RECIPEBOX_`)
/// 2. TOML config file at `~/.config/recipebox/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Image configuration.
    pub images: ImageConfig,
    /// Input validation configuration.
    pub validation: ValidationConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/recipebox/recipes.db`
    pub database_path: Option<PathBuf>,
    /// Directory holding recipe and profile images.
    /// Defaults to `~/.local/share/recipebox/images`
    pub media_dir: Option<PathBuf>,
}

/// What to do when an image cannot be stored alongside a record write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePolicy {
    /// Save the record anyway and report the image failure as a warning.
    #[default]
    Lenient,
    /// Abort the whole operation before the record is written.
    Strict,
}

impl std::fmt::Display for ImagePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lenient => write!(f, "lenient"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// Image-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Failure policy for image writes.
    pub policy: ImagePolicy,
    /// Largest accepted image in bytes.
    pub max_bytes: usize,
}

/// Input validation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Reject recipes whose name or category is blank.
    pub reject_blank_fields: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            policy: ImagePolicy::Lenient,
            max_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            reject_blank_fields: true,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// Sources are merged in this order (later sources override earlier):
    /// defaults, the TOML file (if it exists), then `RECIPEBOX_` environment
    /// variables, where `__` separates nested keys
    /// (`RECIPEBOX_IMAGES__POLICY=strict`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("RECIPEBOX_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.images.max_bytes == 0 {
            return Err(Error::ConfigValidation {
                message: "images.max_bytes must be greater than 0".to_string(),
            });
        }

        if let Some(media) = &self.storage.media_dir {
            if media.to_str().is_none() {
                return Err(Error::ConfigValidation {
                    message: format!(
                        "storage.media_dir {} is not valid UTF-8",
                        media.display()
                    ),
                });
            }
        }

        if let (Some(db), Some(media)) = (&self.storage.database_path, &self.storage.media_dir) {
            if db == media {
                return Err(Error::ConfigValidation {
                    message: format!(
                        "storage.database_path and storage.media_dir are both {}",
                        db.display()
                    ),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the media directory, resolving defaults if not set.
    #[must_use]
    pub fn media_dir(&self) -> PathBuf {
        self.storage
            .media_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(MEDIA_DIR_NAME))
    }
}
