//! Server configuration for antakshari
//!
//! This module handles the settings stored in settings.json and the
//! environment variables that override them on every start.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::Paths;

/// Server configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Server ID used as the JWT secret
    #[serde(default)]
    pub server_id: String,

    /// Email of the single privileged account
    #[serde(default = "default_admin_email")]
    pub admin_email: String,

    /// Songs drawn per language in a free round
    #[serde(default = "default_sample_per_language")]
    pub sample_per_language: usize,

    /// Largest accepted audio upload, in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,

    /// Where uploaded audio is hosted
    #[serde(default)]
    pub media: MediaConfig,

    /// Replacement for the built-in rotation table
    #[serde(default)]
    pub rotation: Option<Vec<Vec<String>>>,
}

/// Media host selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaProvider {
    Local,
    Cloudinary,
}

/// Media host settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaConfig {
    #[serde(default = "default_media_provider")]
    pub provider: MediaProvider,
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            provider: MediaProvider::Local,
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_id: String::new(),
            admin_email: default_admin_email(),
            sample_per_language: default_sample_per_language(),
            max_upload_mb: default_max_upload_mb(),
            media: MediaConfig::default(),
            rotation: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the settings file in the config directory
    pub fn load() -> Result<Self> {
        let paths = Paths::get()?;
        Self::load_from(&paths.settings_path())
    }

    /// Load configuration from a specific file, writing defaults if it is missing
    pub fn load_from(settings_path: &Path) -> Result<Self> {
        if settings_path.exists() {
            let content =
                std::fs::read_to_string(settings_path).context("Failed to read settings file")?;
            let config: ServerConfig =
                serde_json::from_str(&content).context("Failed to parse settings file")?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(settings_path)?;
            Ok(config)
        }
    }

    /// Save configuration to the settings file in the config directory
    pub fn save(&self) -> Result<()> {
        let paths = Paths::get()?;
        self.save_to(&paths.settings_path())
    }

    fn save_to(&self, settings_path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(settings_path, content).context("Failed to write settings file")?;

        Ok(())
    }

    /// Apply environment overrides. These are not written back to disk so
    /// secrets handed in through the environment stay out of settings.json.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(email) = non_empty("ANTAKSHARI_ADMIN_EMAIL") {
            self.admin_email = email.trim().to_string();
        }

        if let Some(secret) = non_empty("JWT_SECRET") {
            self.server_id = secret;
        }

        let cloud_name = non_empty("CLOUDINARY_CLOUD_NAME");
        let api_key = non_empty("CLOUDINARY_API_KEY");
        let api_secret = non_empty("CLOUDINARY_API_SECRET");
        if let (Some(cloud_name), Some(api_key), Some(api_secret)) = (cloud_name, api_key, api_secret)
        {
            self.media = MediaConfig {
                provider: MediaProvider::Cloudinary,
                cloud_name,
                api_key,
                api_secret,
            };
        }
    }

    /// Upload limit in bytes
    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }

    /// Whether the given email belongs to the privileged account
    pub fn is_admin_email(&self, email: &str) -> bool {
        !self.admin_email.is_empty() && self.admin_email.eq_ignore_ascii_case(email.trim())
    }
}

// Default value functions for serde

fn default_admin_email() -> String {
    "admin@gmail.com".to_string()
}

fn default_sample_per_language() -> usize {
    5
}

fn default_max_upload_mb() -> u64 {
    500
}

fn default_media_provider() -> MediaProvider {
    MediaProvider::Local
}
