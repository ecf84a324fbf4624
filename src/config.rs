//! Sweep configuration loaded from a TOML file plus the process environment.
//!
//! One `SweepConfig` is constructed at startup and passed by reference to
//! every component; nothing here is process-global.

use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::SweepError;
use crate::resilient::RetryPolicy;
use crate::sweep::SweepPlan;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const DEFAULT_THIRD_CRITERION: &str = "Verbosity";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_OUTPUT_PATH: &str = "sweep_results.csv";

/// Top-level configuration for a sweep run.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Parameter axes to enumerate.
    #[serde(flatten)]
    pub plan: SweepPlan,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub output: OutputConfig,
    /// Worker pool size; 1 means strictly sequential processing.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// System instruction sent ahead of every sweep prompt.
    pub system_prompt: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Name of the third scoring criterion alongside Clarity and Specificity.
    pub third_criterion: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            third_criterion: DEFAULT_THIRD_CRITERION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible service.
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_seconds: Some(60),
        }
    }
}

/// What to do when the output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPolicy {
    /// Replace any previous table.
    Overwrite,
    /// Add rows to an existing table, skipping the header if present.
    Append,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the exported result table.
    pub path: String,
    /// Explicit policy for pre-existing output files.
    pub policy: OutputPolicy,
    /// Render comparison charts after export.
    pub charts: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_OUTPUT_PATH.to_string(),
            policy: OutputPolicy::Overwrite,
            charts: false,
        }
    }
}

fn default_concurrency() -> usize {
    1
}

impl SweepConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SweepError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SweepError::Config(format!("cannot read config file: {e}")))?;
        let config: SweepConfig = toml::from_str(&raw)
            .map_err(|e| SweepError::Config(format!("invalid config file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that TOML deserialization cannot express.
    pub fn validate(&self) -> Result<(), SweepError> {
        for t in &self.plan.temperatures {
            if !(0.0..=2.0).contains(t) {
                return Err(SweepError::Config(format!(
                    "temperature {t} outside the supported 0.0-2.0 range"
                )));
            }
        }
        if self.plan.max_tokens.iter().any(|&k| k == 0) {
            return Err(SweepError::Config(
                "max_tokens values must be positive".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(SweepError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(SweepError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Reads the API key from the configured environment variable.
    ///
    /// Absence is a fatal configuration error, not a retryable one.
    pub fn api_key(&self) -> Result<SecretString, SweepError> {
        match std::env::var(&self.provider.api_key_env) {
            Ok(key) if !key.is_empty() => Ok(SecretString::new(key)),
            _ => Err(SweepError::Config(format!(
                "missing API key: set the {} environment variable",
                self.provider.api_key_env
            ))),
        }
    }
}
