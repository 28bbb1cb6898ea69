//! Configuration management for the BSA pipeline
//!
//! Project-level settings live in `.bsa/config.toml`: model selection, gateway
//! pacing and retry knobs, request defaults and the session directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{BsaError, ContextDensity, HyperScaler, Result};

/// Project-level configuration
///
/// Loaded from `.bsa/config.toml` in the project root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BsaConfig {
    /// Model selection
    #[serde(default)]
    pub models: ModelConfig,

    /// Gateway pacing and retry behavior
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Defaults applied to new proposal requests
    #[serde(default)]
    pub defaults: RequestDefaults,

    /// Session persistence
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Execution-team rate card for cost estimation
    #[serde(default)]
    pub cost: CostConfig,
}

/// Model identifiers per role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Deep reasoning model (architect, writer)
    #[serde(default = "default_reasoning_pro")]
    pub reasoning_pro: String,

    /// Fast model (research, validation, audit, fallbacks)
    #[serde(default = "default_reasoning_flash")]
    pub reasoning_flash: String,

    /// High quality image model
    #[serde(default = "default_vision_pro")]
    pub vision_pro: String,

    /// Default image model
    #[serde(default = "default_vision_flash")]
    pub vision_flash: String,
}

/// Gateway pacing and retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Seconds to pause before every model call (external rate limits)
    #[serde(default)]
    pub api_delay_secs: u64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Linear backoff unit; attempt `n` waits `n * backoff_unit_ms`
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,

    /// Output budget merged into every request that doesn't set its own
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the generative language API
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// Defaults for new proposal requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDefaults {
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub hyper_scaler: HyperScaler,

    #[serde(default)]
    pub context_density: ContextDensity,
}

/// Session persistence configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding one JSON file per session, relative to the project root
    #[serde(default = "default_session_dir")]
    pub dir: PathBuf,
}

/// Rate card offered to the cost estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostConfig {
    /// Role name to hourly rate (USD)
    #[serde(default = "default_rates")]
    pub rates: BTreeMap<String, f64>,
}

// Default value providers
fn default_reasoning_pro() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_reasoning_flash() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_vision_pro() -> String {
    "gemini-3-pro-image-preview".to_string()
}

fn default_vision_flash() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn default_max_output_tokens() -> u32 {
    65536
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_language() -> String {
    "English".to_string()
}

fn default_session_dir() -> PathBuf {
    PathBuf::from(".bsa/sessions")
}

fn default_rates() -> BTreeMap<String, f64> {
    [
        ("Tech Lead", 65.0),
        ("Cloud Engineer Sr", 55.0),
        ("Cloud Engineer SSr", 45.0),
        ("DevOps Engineer Sr", 55.0),
        ("DevOps Engineer SSr", 45.0),
        ("Data Engineer Sr", 55.0),
        ("Backend Developer Sr", 50.0),
        ("Backend Developer SSr", 40.0),
        ("Frontend Developer SSr", 40.0),
        ("Data Scientist Sr", 60.0),
        ("Security Engineer Sr", 60.0),
        ("QA Manual", 30.0),
        ("QA Automation (TAE)", 40.0),
        ("Business Analyst", 45.0),
        ("Service Delivery Manager", 50.0),
    ]
    .into_iter()
    .map(|(role, rate)| (role.to_string(), rate))
    .collect()
}

impl BsaConfig {
    /// Load configuration from `.bsa/config.toml` or use defaults
    pub fn load_or_default(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".bsa/config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| BsaError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Write default configuration to `.bsa/config.toml`
    pub fn write_default(project_root: &Path) -> Result<PathBuf> {
        let config_dir = project_root.join(".bsa");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| BsaError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// Absolute session directory for a project root
    pub fn session_dir(&self, project_root: &Path) -> PathBuf {
        if self.sessions.dir.is_absolute() {
            self.sessions.dir.clone()
        } else {
            project_root.join(&self.sessions.dir)
        }
    }
}

impl GatewayConfig {
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_secs(self.api_delay_secs)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    /// Override the pacing delay, e.g. from a request's `apiDelay`
    pub fn with_api_delay(mut self, seconds: u64) -> Self {
        self.api_delay_secs = seconds;
        self
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            reasoning_pro: default_reasoning_pro(),
            reasoning_flash: default_reasoning_flash(),
            vision_pro: default_vision_pro(),
            vision_flash: default_vision_flash(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_delay_secs: 0,
            max_retries: default_max_retries(),
            backoff_unit_ms: default_backoff_unit_ms(),
            max_output_tokens: default_max_output_tokens(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
        }
    }
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            language: default_language(),
            hyper_scaler: HyperScaler::default(),
            context_density: ContextDensity::default(),
        }
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            rates: default_rates(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: default_session_dir(),
        }
    }
}
