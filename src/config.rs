//! Configuration loading and validation
//!
//! A single JSON file holds everything: logging severity, Plex credentials
//! and server/user priority lists, the TMDB toggle and key, and the Discord
//! application settings. It is read once at startup and never mutated.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the platform config directory and
/// then the working directory
const CONFIG_FILE: &str = "config.json";

/// File the Plex auth token is cached in, beside the config file
const TOKEN_FILE: &str = "plex_token";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingSettings,
    pub plex: PlexSettings,
    #[serde(default)]
    pub tmdb: TmdbSettings,
    pub discord: DiscordSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Severity name accepted by tracing (trace, debug, info, warn, error)
    #[serde(default = "default_severity")]
    pub severity: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            severity: default_severity(),
        }
    }
}

fn default_severity() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlexSettings {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Prompt for a verification code at login
    #[serde(default, rename = "twoFactor")]
    pub two_factor: bool,
    /// Server names in priority order
    pub servers: Vec<String>,
    /// Usernames whose sessions are mirrored, in priority order
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbSettings {
    #[serde(default)]
    pub enable: bool,
    #[serde(default, rename = "apiKey")]
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordSettings {
    #[serde(rename = "appId")]
    pub app_id: String,
    /// Suppress granular presence fields (year, secondary line, buttons)
    #[serde(default)]
    pub minimal: bool,
}

impl Config {
    /// Load the configuration from `path`, or from the default locations
    /// when no path is given. Returns the config together with the directory
    /// it was loaded from, which also hosts the token cache.
    pub fn load(path: Option<&Path>) -> Result<(Self, PathBuf)> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };

        let raw = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok((config, dir))
    }

    /// Validate the loaded configuration. `has_token` reports whether a
    /// cached Plex token exists, which makes the credentials optional.
    pub fn validate(&self, has_token: bool) -> Result<()> {
        if !has_token && (self.plex.username.is_empty() || self.plex.password.is_empty()) {
            return Err(Error::Config(
                "plex.username and plex.password are required without a cached token".to_string(),
            ));
        }
        if self.plex.servers.is_empty() {
            return Err(Error::Config("plex.servers must not be empty".to_string()));
        }
        if self.plex.users.is_empty() {
            return Err(Error::Config("plex.users must not be empty".to_string()));
        }
        if self.discord.app_id.is_empty() {
            return Err(Error::Config("discord.appId is required".to_string()));
        }
        if self.tmdb.enable && self.tmdb.api_key.is_empty() {
            return Err(Error::Config(
                "tmdb.apiKey is required when tmdb.enable is set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Path of the token cache beside the config file
pub fn token_cache_path(config_dir: &Path) -> PathBuf {
    config_dir.join(TOKEN_FILE)
}

fn default_config_path() -> PathBuf {
    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("plexcord").join(CONFIG_FILE);
        if candidate.exists() {
            return candidate;
        }
    }
    PathBuf::from(CONFIG_FILE)
}
