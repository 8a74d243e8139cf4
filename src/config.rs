//! Configuration management for the cloud music metadata provider.
//!
//! This module loads configuration values from environment variables and a
//! `.env` file, and resolves them into a [`Settings`] value that is handed to
//! [`crate::provider::MetadataProvider::setup`].
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)

use std::{env, path::PathBuf};

use thiserror::Error;

pub const API_URL: &str = "CLOUDMETA_API_URL";
pub const ENABLE_ARTIST_METADATA: &str = "CLOUDMETA_ENABLE_ARTIST_METADATA";
pub const ENABLE_ALBUM_METADATA: &str = "CLOUDMETA_ENABLE_ALBUM_METADATA";
pub const ENABLE_TRACK_METADATA: &str = "CLOUDMETA_ENABLE_TRACK_METADATA";
pub const ENABLE_IMAGES: &str = "CLOUDMETA_ENABLE_IMAGES";
pub const WRITE_TAGS: &str = "CLOUDMETA_WRITE_TAGS";
pub const AUTO_TRIGGER_NO_IMAGE: &str = "CLOUDMETA_AUTO_TRIGGER_NO_IMAGE";
pub const INSTANCE_ID: &str = "CLOUDMETA_INSTANCE_ID";
pub const CACHE_DIR: &str = "CLOUDMETA_CACHE_DIR";

pub const DEFAULT_INSTANCE_ID: &str = "cloudmeta";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid boolean value {value:?}")]
    InvalidBool { name: &'static str, value: String },
    #[error("cannot prepare data directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot load .env file: {0}")]
    Dotenv(#[from] dotenv::Error),
}

/// Resolved provider configuration.
///
/// Fields are public so a host can build the value programmatically instead
/// of going through the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub enable_artist_metadata: bool,
    pub enable_album_metadata: bool,
    pub enable_track_metadata: bool,
    pub enable_images: bool,
    pub write_tags: bool,
    pub auto_trigger_no_image: bool,
    pub instance_id: String,
    pub cache_dir: PathBuf,
}

impl Settings {
    /// Builds settings for the given catalog base URL with every other
    /// option at its default.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            enable_artist_metadata: true,
            enable_album_metadata: true,
            enable_track_metadata: true,
            enable_images: true,
            write_tags: false,
            auto_trigger_no_image: true,
            instance_id: DEFAULT_INSTANCE_ID.to_string(),
            cache_dir: default_cache_dir(),
        }
    }

    /// Resolves settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `CLOUDMETA_API_URL` is unset or
    /// blank, and [`ConfigError::InvalidBool`] when a flag cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = env::var(API_URL)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing(API_URL))?;

        let mut settings = Self::new(api_url.trim());
        settings.enable_artist_metadata = env_flag(ENABLE_ARTIST_METADATA, true)?;
        settings.enable_album_metadata = env_flag(ENABLE_ALBUM_METADATA, true)?;
        settings.enable_track_metadata = env_flag(ENABLE_TRACK_METADATA, true)?;
        settings.enable_images = env_flag(ENABLE_IMAGES, true)?;
        settings.write_tags = env_flag(WRITE_TAGS, false)?;
        settings.auto_trigger_no_image = env_flag(AUTO_TRIGGER_NO_IMAGE, true)?;

        if let Ok(instance_id) = env::var(INSTANCE_ID) {
            if !instance_id.trim().is_empty() {
                settings.instance_id = instance_id.trim().to_string();
            }
        }
        if let Some(cache_dir) = env::var_os(CACHE_DIR) {
            settings.cache_dir = PathBuf::from(cache_dir);
        }

        Ok(settings)
    }
}

/// Loads environment variables from a `.env` file in the local data directory.
///
/// The file lives at `<data_local_dir>/cloudmeta/.env`:
/// - Linux: `~/.local/share/cloudmeta/.env`
/// - macOS: `~/Library/Application Support/cloudmeta/.env`
/// - Windows: `%LOCALAPPDATA%/cloudmeta/.env`
///
/// A missing file is not an error; variables may come from the environment
/// alone. Variables already present in the environment are not overridden.
pub async fn load_env() -> Result<(), ConfigError> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    match dotenv::from_path(&path) {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Root directory for everything cloudmeta stores locally.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("cloudmeta");
    path
}

fn default_cache_dir() -> PathBuf {
    data_dir().join("cache")
}

fn env_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_flag(&value).ok_or(ConfigError::InvalidBool { name, value }),
        Err(_) => Ok(default),
    }
}

/// Parses the boolean spellings accepted in the environment.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
