//! Configuration loading and validation.
//!
//! Settings come from a TOML file (`--config`, `$SIEVE_CONFIG_PATH`, or
//! `~/.sieve/config.toml`). Environment variables override file values;
//! file values override defaults. A missing default file is not an error.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Env var naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "SIEVE_CONFIG_PATH";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Model server and generation settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Batch orchestration settings.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Logging output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which model to call and how.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Model spec in `provider/model` form (e.g. "ollama/llama3.1:8b").
    #[serde(default = "default_model_spec")]
    pub spec: String,

    /// Server base URL; provider default when unset.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Maximum tokens generated per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature; server default when unset.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Name of an env var holding a bearer token for OpenAI-compatible servers.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            spec: default_model_spec(),
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: None,
            timeout_secs: default_timeout_secs(),
            api_key_env: None,
        }
    }
}

/// Batch orchestration settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Maximum model requests in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Header of the subject column in the input table.
    #[serde(default = "default_subject_column")]
    pub subject_column: String,

    /// Header of the sender column in the input table.
    #[serde(default = "default_sender_column")]
    pub sender_column: String,

    /// Also write each raw model reply to the output.
    #[serde(default)]
    pub keep_raw: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            subject_column: default_subject_column(),
            sender_column: default_sender_column(),
            keep_raw: false,
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily-rotated JSON logs; stderr only when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

// Default value functions for serde

fn default_model_spec() -> String {
    "ollama/llama3.1:8b".to_owned()
}
fn default_max_tokens() -> u32 {
    256
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_concurrency() -> usize {
    4
}
fn default_subject_column() -> String {
    "Subject".to_owned()
}
fn default_sender_column() -> String {
    "Sender".to_owned()
}

impl Config {
    /// Parse a TOML string into config (no env overrides).
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids `set_var` in tests).
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("SIEVE_MODEL") {
            self.model.spec = v;
        }
        if let Some(v) = env("SIEVE_BASE_URL") {
            self.model.base_url = Some(v);
        }
        if let Some(v) = env("SIEVE_MAX_TOKENS") {
            match v.parse() {
                Ok(n) => self.model.max_tokens = n,
                Err(_) => tracing::warn!(
                    var = "SIEVE_MAX_TOKENS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("SIEVE_CONCURRENCY") {
            match v.parse() {
                Ok(n) => self.batch.concurrency = n,
                Err(_) => tracing::warn!(
                    var = "SIEVE_CONCURRENCY",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
    }

    /// Reject settings that cannot work.
    ///
    /// # Errors
    ///
    /// Returns an error for zero concurrency, an empty column name, or a
    /// base URL that does not parse.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch.concurrency == 0 {
            anyhow::bail!("batch.concurrency must be at least 1");
        }
        if self.batch.subject_column.is_empty() || self.batch.sender_column.is_empty() {
            anyhow::bail!("batch.subject_column and batch.sender_column must be non-empty");
        }
        if let Some(base_url) = &self.model.base_url {
            url::Url::parse(base_url)
                .with_context(|| format!("invalid model.base_url '{base_url}'"))?;
        }
        Ok(())
    }
}

/// Load the config from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Resolve, load and apply env overrides to the configuration.
///
/// An explicit path (argument or `$SIEVE_CONFIG_PATH`) must exist; the
/// default `~/.sieve/config.toml` may be absent, in which case defaults apply.
/// Callers layer their own overrides on top and then call
/// [`Config::validate`].
///
/// # Errors
///
/// Returns an error if an explicit file is missing or any file fails to parse.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<Config> {
    load_with(explicit, |key| std::env::var(key).ok())
}

/// [`load`] with an injected env resolver.
#[doc(hidden)]
pub fn load_with(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Config> {
    let explicit = explicit
        .map(Path::to_path_buf)
        .or_else(|| env(CONFIG_PATH_ENV).map(PathBuf::from));

    let mut config = match explicit {
        Some(path) => load_config(&path)?,
        None => {
            let path = config_dir()?.join("config.toml");
            if path.exists() {
                tracing::info!(path = %path.display(), "loading config from file");
                load_config(&path)?
            } else {
                tracing::debug!("no config file found, using defaults");
                Config::default()
            }
        }
    };

    config.apply_overrides(env);
    Ok(config)
}

/// Resolve the default config directory (`~/.sieve/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".sieve"))
}
