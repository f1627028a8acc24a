//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::client::DEFAULT_API_BASE;
use crate::mood::{normalize_color, DEFAULT_PALETTE};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Journaling API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Local cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("mood-diary").to_string_lossy().to_string())
        .unwrap_or_else(|| "./mood_diary_data".to_string())
}

impl CacheConfig {
    /// Data directory with a leading `~` expanded
    pub fn data_dir(&self) -> PathBuf {
        match self.data_dir.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(&self.data_dir)),
            None => PathBuf::from(&self.data_dir),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// First column of the month grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }
}

impl FromStr for WeekStart {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            "monday" | "mon" => Ok(WeekStart::Monday),
            other => Err(ConfigError::Invalid(format!(
                "week_start must be 'sunday' or 'monday', got '{}'",
                other
            ))),
        }
    }
}

/// Calendar display configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub week_start: WeekStart,

    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
}

fn default_palette() -> Vec<String> {
    DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            week_start: WeekStart::default(),
            palette: default_palette(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse and validate TOML content
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        Self::load(path)?.with_overrides(|key| std::env::var(key).ok())
    }

    /// Load from an explicit path, default locations, or environment
    pub fn load_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_with_env(path)?;
            tracing::info!("Loaded config from {:?}", path);
            return Ok(config);
        }

        let config_paths = [
            dirs::config_dir().map(|p| p.join("mood-diary").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply `MOOD_DIARY_*` overrides, then validate the result
    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        self.apply_overrides(lookup);
        self.validate()?;
        Ok(self)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("MOOD_DIARY_API_URL") {
            self.api.base_url = url;
        }
        if let Some(data_dir) = lookup("MOOD_DIARY_DATA_DIR") {
            self.cache.data_dir = data_dir;
        }
        if let Some(week_start) = lookup("MOOD_DIARY_WEEK_START") {
            match week_start.parse() {
                Ok(ws) => self.calendar.week_start = ws,
                Err(e) => tracing::warn!("Ignoring MOOD_DIARY_WEEK_START: {}", e),
            }
        }
        if let Some(level) = lookup("MOOD_DIARY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("MOOD_DIARY_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Check values serde cannot; palette colors are normalized in place
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url is empty".to_string()));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "api.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.calendar.palette.is_empty() {
            return Err(ConfigError::Invalid("calendar.palette is empty".to_string()));
        }

        let mut palette = Vec::with_capacity(self.calendar.palette.len());
        for color in &self.calendar.palette {
            let color = normalize_color(color)
                .map_err(|e| ConfigError::Invalid(format!("calendar.palette: {}", e)))?;
            palette.push(color);
        }
        self.calendar.palette = palette;

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be 'pretty' or 'json', got '{}'",
                self.logging.format
            )));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r##"# Mood Diary Configuration
#
# Environment variables override these settings:
# - MOOD_DIARY_API_URL
# - MOOD_DIARY_DATA_DIR
# - MOOD_DIARY_WEEK_START
# - MOOD_DIARY_LOG_LEVEL
# - MOOD_DIARY_LOG_FORMAT

[api]
# Journaling API base URL
base_url = "http://localhost:3011"

# Request timeout in seconds
request_timeout_secs = 30

[cache]
# Directory for the local cache (token, profile, moods, stickers)
data_dir = "~/.local/share/mood-diary"

[calendar]
# First column of the month grid: sunday or monday
week_start = "sunday"

# Mood colors offered when setting a day's mood
palette = ["#FFABAB", "#FFC3A0", "#FFF58E", "#CDE6A5", "#ACD1EA", "#9FB1D9", "#C8BFE7"]

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/mood-diary/mood-diary.log"
"##
    .to_string()
}
