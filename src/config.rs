//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::emotion::{default_rules, AggregatorConfig, AlertRule};
use crate::websocket::HubConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub hub: HubSettings,

    #[serde(default)]
    pub aggregator: AggregatorSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Empty list allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connection hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HubSettings {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_write_timeout")]
    pub write_timeout_ms: u64,
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_write_timeout() -> u64 {
    2000
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            write_timeout_ms: default_write_timeout(),
        }
    }
}

impl HubSettings {
    pub fn to_hub_config(&self) -> HubConfig {
        HubConfig {
            queue_capacity: self.queue_capacity,
            write_timeout: Duration::from_millis(self.write_timeout_ms),
        }
    }
}

/// Window and alert evaluation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorSettings {
    #[serde(default = "default_keep_duration")]
    pub keep_duration_ms: u64,

    #[serde(default = "default_check_interval")]
    pub check_interval_ms: u64,

    #[serde(default = "default_sustain_duration")]
    pub sustain_duration_ms: u64,

    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    #[serde(default = "default_rules")]
    pub rules: Vec<AlertRule>,
}

fn default_keep_duration() -> u64 {
    10_000
}

fn default_check_interval() -> u64 {
    1000
}

fn default_sustain_duration() -> u64 {
    5000
}

fn default_min_confidence() -> f64 {
    0.4
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            keep_duration_ms: default_keep_duration(),
            check_interval_ms: default_check_interval(),
            sustain_duration_ms: default_sustain_duration(),
            min_confidence: default_min_confidence(),
            rules: default_rules(),
        }
    }
}

impl AggregatorSettings {
    pub fn to_aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            keep_duration: Duration::from_millis(self.keep_duration_ms),
            check_interval: Duration::from_millis(self.check_interval_ms),
            sustain_duration: Duration::from_millis(self.sustain_duration_ms),
            min_confidence: self.min_confidence,
            rules: self.rules.clone(),
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

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Standard config locations, in search order
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("emotion-stream").join("config.toml"));
        }
        paths.push(PathBuf::from("./config.toml"));
        paths
    }

    /// Load from default locations or environment.
    ///
    /// Runs before logging is up, so nothing is logged here: the caller gets
    /// the file that was used, and a file that exists but cannot be loaded is
    /// an error rather than a silent fallback.
    pub fn load_default() -> Result<(Self, Option<PathBuf>), ConfigError> {
        Self::load_first(&Self::default_paths())
    }

    /// Load the first existing file among `candidates`
    pub fn load_first(candidates: &[PathBuf]) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match candidates.iter().find(|path| path.exists()) {
            Some(path) => Ok((Self::load_with_env(path)?, Some(path.clone()))),
            None => Ok((Self::from_env(), None)),
        }
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("EMOTION_STREAM_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("EMOTION_STREAM_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(origins) = lookup("EMOTION_STREAM_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(ms) = lookup("EMOTION_STREAM_WRITE_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.hub.write_timeout_ms = ms;
        }

        if let Some(ms) = lookup("EMOTION_STREAM_KEEP_DURATION_MS").and_then(|v| v.parse().ok()) {
            self.aggregator.keep_duration_ms = ms;
        }
        if let Some(ms) = lookup("EMOTION_STREAM_CHECK_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.aggregator.check_interval_ms = ms;
        }
        if let Some(ms) = lookup("EMOTION_STREAM_SUSTAIN_DURATION_MS").and_then(|v| v.parse().ok()) {
            self.aggregator.sustain_duration_ms = ms;
        }
        if let Some(c) = lookup("EMOTION_STREAM_MIN_CONFIDENCE").and_then(|v| v.parse().ok()) {
            self.aggregator.min_confidence = c;
        }

        if let Some(level) = lookup("EMOTION_STREAM_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("EMOTION_STREAM_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Reject settings the runtime cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hub.queue_capacity == 0 {
            return Err(ConfigError::Invalid("hub.queue_capacity must be > 0".into()));
        }
        if self.hub.write_timeout_ms == 0 {
            return Err(ConfigError::Invalid("hub.write_timeout_ms must be > 0".into()));
        }
        if self.aggregator.check_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "aggregator.check_interval_ms must be > 0".into(),
            ));
        }
        if self.aggregator.sustain_duration_ms > self.aggregator.keep_duration_ms {
            return Err(ConfigError::Invalid(
                "aggregator.sustain_duration_ms cannot exceed keep_duration_ms".into(),
            ));
        }
        for rule in &self.aggregator.rules {
            if rule.label.is_empty() {
                return Err(ConfigError::Invalid("alert rule label is empty".into()));
            }
            if !(0.0..=1.0).contains(&rule.threshold) {
                return Err(ConfigError::Invalid(format!(
                    "alert rule '{}' threshold must be within 0..=1",
                    rule.label
                )));
            }
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
    r#"# Emotion Stream Configuration
#
# Environment variables override these settings:
# - EMOTION_STREAM_HOST
# - EMOTION_STREAM_PORT
# - EMOTION_STREAM_CORS_ORIGINS (comma-separated)
# - EMOTION_STREAM_WRITE_TIMEOUT_MS
# - EMOTION_STREAM_KEEP_DURATION_MS
# - EMOTION_STREAM_CHECK_INTERVAL_MS
# - EMOTION_STREAM_SUSTAIN_DURATION_MS
# - EMOTION_STREAM_MIN_CONFIDENCE
# - EMOTION_STREAM_LOG_LEVEL
# - EMOTION_STREAM_LOG_FORMAT

[server]
host = "0.0.0.0"
port = 8080

# Allowed CORS origins (empty list allows any origin)
cors_origins = ["http://localhost:3000"]

[hub]
# Pending hub commands before broadcasts start being dropped
queue_capacity = 1024

# A connection whose write takes longer than this is dropped (ms)
write_timeout_ms = 2000

[aggregator]
# How long readings stay in the window (ms)
keep_duration_ms = 10000

# How often the window is evaluated (ms)
check_interval_ms = 1000

# Minimum window span before alerts are considered (ms)
sustain_duration_ms = 5000

# Readings whose dominant score is below this are ignored
min_confidence = 0.4

# Checked in order, first match wins
[[aggregator.rules]]
label = "angry"
threshold = 0.8
level = "warning"
message = "Anger has stayed high for a sustained period"

[[aggregator.rules]]
label = "sad"
threshold = 0.7
level = "info"
message = "Sadness has persisted for a sustained period"

[[aggregator.rules]]
label = "neutral"
threshold = 0.9
level = "info"
message = "Expression has remained neutral for a sustained period"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
