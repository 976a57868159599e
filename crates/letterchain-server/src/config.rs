//! Server configuration.
//!
//! Loaded from a TOML file with serde defaults for every field, so an empty
//! file (or none at all) yields a runnable development setup. CLI arguments
//! override the file.

use std::path::{Path, PathBuf};

use letterchain_core::chain::ContinuationLength;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Path to the SQLite database file.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Newline-separated word list; when absent, a small embedded Spanish
    /// list is used (enough for development, not for play).
    #[serde(default)]
    pub dictionary_file: Option<PathBuf>,

    /// Language assumed when a request does not name one.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Game timing and rule variant.
    #[serde(default)]
    pub game: GameSettings,

    /// Per-IP rate limiting for the API endpoints.
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            database: default_database(),
            dictionary_file: None,
            default_language: default_language(),
            game: GameSettings::default(),
            rate_limit: RateLimitSettings::default(),
        }
    }
}

/// Game timing and rule variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GameSettings {
    /// Fixed game length in seconds.
    #[serde(default = "default_game_duration")]
    pub duration_seconds: u32,

    /// Network-latency slack added to the duration before a submission is
    /// considered expired.
    #[serde(default = "default_submission_buffer")]
    pub submission_buffer_seconds: u32,

    /// Trailing characters the next word must continue (1 or 2).
    #[serde(default = "default_continuation")]
    pub continuation_length: u8,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            duration_seconds: default_game_duration(),
            submission_buffer_seconds: default_submission_buffer(),
            continuation_length: default_continuation(),
        }
    }
}

impl GameSettings {
    /// The configured continuation variant; anything other than 2 is the
    /// one-letter rule.
    #[must_use]
    pub const fn continuation(&self) -> ContinuationLength {
        match self.continuation_length {
            2 => ContinuationLength::Two,
            _ => ContinuationLength::One,
        }
    }
}

/// Per-IP rate limiting settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Requests allowed per window per client.
    #[serde(default = "default_rate_max")]
    pub max_requests: u32,

    /// Window length in seconds.
    #[serde(default = "default_rate_window")]
    pub window_seconds: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: default_rate_max(),
            window_seconds: default_rate_window(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_database() -> PathBuf {
    PathBuf::from("letterchain.db")
}

fn default_language() -> String {
    "es".to_string()
}

const fn default_game_duration() -> u32 {
    60
}

const fn default_submission_buffer() -> u32 {
    10
}

const fn default_continuation() -> u8 {
    1
}

const fn default_rate_max() -> u32 {
    30
}

const fn default_rate_window() -> u64 {
    60
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML does not match the schema.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.default_language, "es");
        assert_eq!(config.game.duration_seconds, 60);
        assert_eq!(config.game.submission_buffer_seconds, 10);
        assert_eq!(config.game.continuation(), ContinuationLength::One);
        assert_eq!(config.rate_limit.max_requests, 30);
    }

    #[test]
    fn partial_config_overrides_selected_fields() {
        let config = ServerConfig::from_toml(
            "bind = \"0.0.0.0:9000\"\n\
             [game]\n\
             continuation_length = 2\n",
        )
        .unwrap();
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.game.continuation(), ContinuationLength::Two);
        // Untouched sections keep their defaults.
        assert_eq!(config.game.duration_seconds, 60);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(ServerConfig::from_toml("bind = [").is_err());
    }
}
