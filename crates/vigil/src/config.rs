//! Agent configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty file
//! is a valid config. The loaded struct is passed down explicitly - no
//! module-level globals, no config read at import time. The API key is
//! deliberately NOT a config field; it arrives via environment or flag.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use vigil_protocol::{ProfileKind, SuccessPolicy};
use vigil_tracker::StageLayout;

/// Config operation result type.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub stages: StagesSection,
    #[serde(default)]
    pub gemini: GeminiSection,
    #[serde(default)]
    pub sink: SinkSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    /// Seconds between polls, and between artifacts within one poll
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Inclusive confidence threshold for a finding to qualify
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    #[serde(default)]
    pub success_policy: SuccessPolicy,

    #[serde(default)]
    pub profile: ProfileKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesSection {
    /// Directory holding the five stage directories
    #[serde(default = "default_stage_root")]
    pub root: String,

    #[serde(default = "default_input_dir")]
    pub input: String,
    #[serde(default = "default_processing_dir")]
    pub processing: String,
    #[serde(default = "default_processed_dir")]
    pub processed: String,
    #[serde(default = "default_detected_dir")]
    pub detected: String,
    #[serde(default = "default_error_dir")]
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiSection {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

/// Which sink backend persists records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SinkBackend {
    #[default]
    Sqlite,
    Jsonl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSection {
    #[serde(default)]
    pub backend: SinkBackend,

    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_jsonl_path")]
    pub jsonl_path: String,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_stage_root() -> String {
    "images".to_string()
}

fn default_input_dir() -> String {
    "input".to_string()
}

fn default_processing_dir() -> String {
    "processing".to_string()
}

fn default_processed_dir() -> String {
    "processed".to_string()
}

fn default_detected_dir() -> String {
    "detected".to_string()
}

fn default_error_dir() -> String {
    "error".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_database_path() -> String {
    "vigil.sqlite3".to_string()
}

fn default_jsonl_path() -> String {
    "records.jsonl".to_string()
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            confidence_threshold: default_confidence_threshold(),
            success_policy: SuccessPolicy::default(),
            profile: ProfileKind::default(),
        }
    }
}

impl Default for StagesSection {
    fn default() -> Self {
        Self {
            root: default_stage_root(),
            input: default_input_dir(),
            processing: default_processing_dir(),
            processed: default_processed_dir(),
            detected: default_detected_dir(),
            error: default_error_dir(),
        }
    }
}

impl Default for GeminiSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
        }
    }
}

impl Default for SinkSection {
    fn default() -> Self {
        Self {
            backend: SinkBackend::default(),
            database_path: default_database_path(),
            jsonl_path: default_jsonl_path(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AgentConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.agent.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "agent.poll_interval_secs must be at least 1".to_string(),
            ));
        }
        let threshold = self.agent.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "agent.confidence_threshold must be within [0.0, 1.0], got {threshold}"
            )));
        }
        Ok(())
    }
}

impl StagesSection {
    /// The stage directory layout this section describes.
    pub fn to_layout(&self) -> StageLayout {
        let mut layout = StageLayout::new(&self.root);
        layout.input = self.input.clone();
        layout.processing = self.processing.clone();
        layout.processed = self.processed.clone();
        layout.detected = self.detected.clone();
        layout.error = self.error.clone();
        layout
    }
}

/// Template written by `vigil init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# Vigil Flow agent configuration.
# Every field is optional; the values below are the defaults.
# The Gemini API key is never stored here - export GEMINI_API_KEY instead.

[agent]
poll_interval_secs = 5
confidence_threshold = 0.7
# "at-least-one": one persisted finding is enough to count the artifact
# as detected. "require-all": every qualifying finding must persist.
success_policy = "at-least-one"
# "parking" or "foodscan"
profile = "parking"

[stages]
root = "images"
input = "input"
processing = "processing"
processed = "processed"
# Rename to taste, e.g. "infractions" for the parking profile
detected = "detected"
error = "error"

[gemini]
model = "gemini-1.5-flash"
endpoint = "https://generativelanguage.googleapis.com/v1beta"

[sink]
# "sqlite" or "jsonl"
backend = "sqlite"
database_path = "vigil.sqlite3"
jsonl_path = "records.jsonl"
"#;
