//! Application configuration for comparekit.
//!
//! User config lives at `~/.comparekit/comparekit.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ComparekitError, Result};
use crate::types::DEFAULT_KEY_COLUMN;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "comparekit.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".comparekit";

// ---------------------------------------------------------------------------
// Config structs (matching comparekit.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Table locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Generation service settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Enrichment run policy.
    #[serde(default)]
    pub enrichment: EnrichmentPolicyConfig,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Raw catalog CSV.
    #[serde(default = "default_raw_table")]
    pub raw_table: String,

    /// Enriched catalog CSV (read and rewritten by the pipeline).
    #[serde(default = "default_enriched_table")]
    pub enriched_table: String,

    /// Column holding the unique entry name.
    #[serde(default = "default_key_column")]
    pub key_column: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_table: default_raw_table(),
            enriched_table: default_enriched_table(),
            key_column: default_key_column(),
        }
    }
}

fn default_raw_table() -> String {
    "data/tools_raw.csv".into()
}
fn default_enriched_table() -> String {
    "data/tools_enriched.csv".into()
}
fn default_key_column() -> String {
    DEFAULT_KEY_COLUMN.into()
}

/// `[provider]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature; kept low so reruns stay consistent.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "DEEPSEEK_API_KEY".into()
}
fn default_base_url() -> String {
    "https://api.deepseek.com".into()
}
fn default_model() -> String {
    "deepseek-chat".into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_timeout_secs() -> u64 {
    60
}

/// How the eligibility filter decides an entry is fully enriched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletenessMode {
    /// Every locale must have a verdict.
    #[default]
    Strict,
    /// Only the default and last locales are checked.
    Fast,
}

impl std::str::FromStr for CompletenessMode {
    type Err = ComparekitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "strict" => Ok(Self::Strict),
            "fast" => Ok(Self::Fast),
            other => Err(ComparekitError::config(format!(
                "unknown completeness mode '{other}': expected 'strict' or 'fast'"
            ))),
        }
    }
}

/// `[enrichment]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentPolicyConfig {
    /// Pause after each successful entry, in ms.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    /// Completeness check used to skip finished entries.
    #[serde(default)]
    pub completeness: CompletenessMode,
}

impl Default for EnrichmentPolicyConfig {
    fn default() -> Self {
        Self {
            rate_limit_ms: default_rate_limit(),
            completeness: CompletenessMode::default(),
        }
    }
}

fn default_rate_limit() -> u64 {
    500
}

impl EnrichmentPolicyConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.comparekit/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ComparekitError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.comparekit/comparekit.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ComparekitError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ComparekitError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject values that would make a run meaningless.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.paths.key_column.trim().is_empty() {
        return Err(ComparekitError::config("paths.key_column must not be empty"));
    }
    if !(0.0..=2.0).contains(&config.provider.temperature) {
        return Err(ComparekitError::config(format!(
            "provider.temperature {} is outside 0.0..=2.0",
            config.provider.temperature
        )));
    }
    if config.provider.timeout_secs == 0 {
        return Err(ComparekitError::config("provider.timeout_secs must be positive"));
    }
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ComparekitError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ComparekitError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ComparekitError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the generation service API key from the configured env var.
pub fn resolve_api_key(config: &ProviderConfig) -> Result<String> {
    let var_name = &config.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(ComparekitError::CredentialMissing {
            var: var_name.clone(),
        }),
    }
}
