//! TOML Configuration File Support
//!
//! Configuration for a chat widget instance, loaded from a TOML file at
//! `~/.config/chat-widget/widget.toml`.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables (`CHAT_WIDGET_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [widget]
//! title = "Customer Support"
//! subtitle = "How can we help you today?"
//! position = "bottom-left"
//! max_messages = 200
//!
//! [stream]
//! min_chunk_delay_ms = 50
//! max_chunk_delay_ms = 150
//! whole_delay_ms = 500
//! timeout_ms = 30000
//!
//! [responder]
//! fallback = "Could you tell me a bit more?"
//!
//! [[responder.rules]]
//! keywords = ["refund"]
//! reply = "Refunds are processed within 5 business days."
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{CannedResponder, ChunkTiming, KeywordRule};
use crate::controller::StreamControllerConfig;

/// Default panel title
pub const DEFAULT_TITLE: &str = "Chat Support";

/// Default panel subtitle
pub const DEFAULT_SUBTITLE: &str = "How can we help you today?";

/// Default replacement text for a failed reply
pub const DEFAULT_APOLOGY: &str =
    "Sorry, there was an error processing your request. Please try again.";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Corner of the page the widget is anchored to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetPosition {
    /// Bottom right corner
    #[default]
    BottomRight,
    /// Bottom left corner
    BottomLeft,
    /// Top right corner
    TopRight,
    /// Top left corner
    TopLeft,
}

impl WidgetPosition {
    /// Kebab-case name, as used in config files
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BottomRight => "bottom-right",
            Self::BottomLeft => "bottom-left",
            Self::TopRight => "top-right",
            Self::TopLeft => "top-left",
        }
    }
}

impl fmt::Display for WidgetPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetPosition {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bottom-right" => Ok(Self::BottomRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "top-right" => Ok(Self::TopRight),
            "top-left" => Ok(Self::TopLeft),
            other => Err(ConfigError::ValidationError(format!(
                "unknown widget position '{other}'"
            ))),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Widget section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSectionToml {
    /// Panel title
    pub title: Option<String>,

    /// Panel subtitle
    pub subtitle: Option<String>,

    /// Anchor corner
    pub position: Option<WidgetPosition>,

    /// Streaming HTTP endpoint for replies
    pub api_endpoint: Option<String>,

    /// Text shown in place of a failed reply
    pub apology: Option<String>,

    /// Maximum transcript length (0 = unlimited)
    pub max_messages: Option<usize>,
}

/// Stream section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamToml {
    /// Minimum delay before each word chunk in milliseconds
    pub min_chunk_delay_ms: Option<u64>,

    /// Maximum delay before each word chunk in milliseconds
    pub max_chunk_delay_ms: Option<u64>,

    /// Delay before a whole-reply chunk in milliseconds
    pub whole_delay_ms: Option<u64>,

    /// Stream timeout in milliseconds (0 = no timeout)
    pub timeout_ms: Option<u64>,
}

/// Responder section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderToml {
    /// Reply used when no rule matches
    pub fallback: Option<String>,

    /// Keyword table replacing the built-in one
    pub rules: Option<Vec<KeywordRule>>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetToml {
    /// Widget configuration section
    pub widget: WidgetSectionToml,

    /// Stream configuration section
    pub stream: StreamToml,

    /// Responder configuration section
    pub responder: ResponderToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration for one widget instance
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct WidgetConfig {
    /// Panel title
    pub title: String,

    /// Panel subtitle
    pub subtitle: String,

    /// Anchor corner
    pub position: WidgetPosition,

    /// Streaming HTTP endpoint (None = local canned replies)
    pub api_endpoint: Option<String>,

    /// Text shown in place of a failed reply
    pub apology: String,

    /// Maximum transcript length (0 = unlimited)
    pub max_messages: usize,

    /// Simulated chunk latencies
    pub timing: ChunkTiming,

    /// Stream timeout (None = no limit)
    pub stream_timeout: Option<Duration>,

    /// Fallback reply override
    pub fallback: Option<String>,

    /// Keyword table override
    pub rules: Option<Vec<KeywordRule>>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            subtitle: DEFAULT_SUBTITLE.to_string(),
            position: WidgetPosition::default(),
            api_endpoint: None,
            apology: DEFAULT_APOLOGY.to_string(),
            max_messages: 0,
            timing: ChunkTiming::default(),
            stream_timeout: None,
            fallback: None,
            rules: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl WidgetConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check the resolved values for consistency
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for an empty title, an inverted
    /// delay range, an empty endpoint or apology, or a rule without keywords.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "title must not be empty".to_string(),
            ));
        }
        if self.timing.min_delay > self.timing.max_delay {
            return Err(ConfigError::ValidationError(format!(
                "min_chunk_delay_ms ({}) exceeds max_chunk_delay_ms ({})",
                self.timing.min_delay.as_millis(),
                self.timing.max_delay.as_millis()
            )));
        }
        if self.apology.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "apology must not be empty".to_string(),
            ));
        }
        if let Some(endpoint) = &self.api_endpoint {
            if endpoint.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "api_endpoint must not be empty when set".to_string(),
                ));
            }
        }
        if let Some(rules) = &self.rules {
            if let Some(index) = rules.iter().position(|r| r.keywords.is_empty()) {
                return Err(ConfigError::ValidationError(format!(
                    "responder rule {index} has no keywords"
                )));
            }
        }
        Ok(())
    }

    /// Chunk latencies for a simulated source
    #[must_use]
    pub fn chunk_timing(&self) -> ChunkTiming {
        self.timing.clone()
    }

    /// Stream controller settings
    #[must_use]
    pub fn controller_config(&self) -> StreamControllerConfig {
        StreamControllerConfig {
            stream_timeout: self.stream_timeout,
        }
    }

    /// Canned responder with any configured overrides applied
    #[must_use]
    pub fn responder(&self) -> CannedResponder {
        let mut responder = CannedResponder::new();
        if let Some(rules) = &self.rules {
            responder = responder.with_rules(rules.clone());
        }
        if let Some(fallback) = &self.fallback {
            responder = responder.with_fallback(fallback.clone());
        }
        responder
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/chat-widget/widget.toml` or
/// `~/.config/chat-widget/widget.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("chat-widget").join("widget.toml"))
}

/// Load configuration from the default path and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<WidgetConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<WidgetConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration, resolving environment variables through `env`
fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<WidgetConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = WidgetConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: WidgetToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env)?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut WidgetConfig, toml: &WidgetToml) {
    // Widget settings
    if let Some(ref title) = toml.widget.title {
        config.title.clone_from(title);
    }
    if let Some(ref subtitle) = toml.widget.subtitle {
        config.subtitle.clone_from(subtitle);
    }
    if let Some(position) = toml.widget.position {
        config.position = position;
    }
    if toml.widget.api_endpoint.is_some() {
        config.api_endpoint.clone_from(&toml.widget.api_endpoint);
    }
    if let Some(ref apology) = toml.widget.apology {
        config.apology.clone_from(apology);
    }
    if let Some(max) = toml.widget.max_messages {
        config.max_messages = max;
    }

    // Stream settings
    if let Some(ms) = toml.stream.min_chunk_delay_ms {
        config.timing.min_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.stream.max_chunk_delay_ms {
        config.timing.max_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.stream.whole_delay_ms {
        config.timing.whole_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.stream.timeout_ms {
        config.stream_timeout = timeout_from_ms(ms);
    }

    // Responder settings
    if toml.responder.fallback.is_some() {
        config.fallback.clone_from(&toml.responder.fallback);
    }
    if toml.responder.rules.is_some() {
        config.rules.clone_from(&toml.responder.rules);
    }
}

/// Apply environment variable overrides to the config
///
/// Unparseable numbers are ignored; an unknown position is an error.
fn apply_env_config<F>(config: &mut WidgetConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let parse_ms = |key: &str| env(key).and_then(|v| v.trim().parse::<u64>().ok());

    if let Some(title) = env("CHAT_WIDGET_TITLE") {
        config.title = title;
        config.source = ConfigSource::Env;
    }
    if let Some(subtitle) = env("CHAT_WIDGET_SUBTITLE") {
        config.subtitle = subtitle;
        config.source = ConfigSource::Env;
    }
    if let Some(position) = env("CHAT_WIDGET_POSITION") {
        config.position = position.parse()?;
        config.source = ConfigSource::Env;
    }
    if let Some(endpoint) = env("CHAT_WIDGET_API_ENDPOINT") {
        config.api_endpoint = Some(endpoint);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_ms("CHAT_WIDGET_MIN_CHUNK_DELAY_MS") {
        config.timing.min_delay = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_ms("CHAT_WIDGET_MAX_CHUNK_DELAY_MS") {
        config.timing.max_delay = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_ms("CHAT_WIDGET_TIMEOUT_MS") {
        config.stream_timeout = timeout_from_ms(ms);
        config.source = ConfigSource::Env;
    }

    Ok(())
}

fn timeout_from_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Title override
    pub title: Option<String>,

    /// Position override
    pub position: Option<WidgetPosition>,

    /// Endpoint override
    pub api_endpoint: Option<String>,

    /// Stream timeout override (milliseconds, 0 = no limit)
    pub timeout_ms: Option<u64>,

    /// Drop all simulated latency
    pub instant: bool,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set title override
    #[must_use]
    pub fn with_title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    /// Set position override
    #[must_use]
    pub fn with_position(mut self, position: WidgetPosition) -> Self {
        self.position = Some(position);
        self
    }

    /// Set endpoint override
    #[must_use]
    pub fn with_api_endpoint(mut self, endpoint: String) -> Self {
        self.api_endpoint = Some(endpoint);
        self
    }

    /// Set timeout override
    #[must_use]
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    /// Disable simulated latency
    #[must_use]
    pub fn with_instant(mut self, instant: bool) -> Self {
        self.instant = instant;
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut WidgetConfig) {
        if self.title.is_some()
            || self.position.is_some()
            || self.api_endpoint.is_some()
            || self.timeout_ms.is_some()
            || self.instant
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref title) = self.title {
            config.title.clone_from(title);
        }
        if let Some(position) = self.position {
            config.position = position;
        }
        if self.api_endpoint.is_some() {
            config.api_endpoint.clone_from(&self.api_endpoint);
        }
        if let Some(ms) = self.timeout_ms {
            config.stream_timeout = timeout_from_ms(ms);
        }
        if self.instant {
            config.timing = ChunkTiming::instant();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
