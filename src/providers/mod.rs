//! LLM provider abstraction layer.
//!
//! Defines the [`LlmProvider`] trait and the shared request/response types
//! used by all provider implementations.
//!
//! Two providers are implemented, both aimed at locally served models:
//! - [`ollama::OllamaProvider`]: Ollama `/api/chat` API
//! - [`openai::OpenAiCompatProvider`]: OpenAI-compatible `/v1/chat/completions`
//!   (LM Studio, llama.cpp server, vLLM)
//!
//! [`from_model_config`] turns a `provider/model` spec into a provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::ModelConfig;

pub mod ollama;
pub mod openai;

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// A single-turn completion request.
///
/// Each request carries one user prompt; there is no shared history.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// User prompt text.
    pub prompt: String,
    /// Maximum tokens in the response.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

/// The reason a completion stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Normal end of turn.
    EndTurn,
    /// Max token limit reached.
    MaxTokens,
    /// Provider-specific other reason.
    Other(String),
}

/// Usage statistics for a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageStats {
    /// Tokens used in the prompt/input.
    pub input_tokens: u32,
    /// Tokens generated in the response.
    pub output_tokens: u32,
}

/// The response from an LLM provider.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated text.
    pub text: String,
    /// Why the model stopped.
    pub stop_reason: StopReason,
    /// Token usage.
    pub usage: UsageStats,
    /// The model identifier that served this response.
    pub model: String,
}

impl CompletionResponse {
    /// Whether generation was cut off by the token limit.
    pub fn truncated(&self) -> bool {
        self.stop_reason == StopReason::MaxTokens
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by model providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response did not match expected schema.
    #[error("provider response parse error: {0}")]
    Parse(String),
    /// Upstream provider responded with an error status.
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
}

/// Errors raised while turning a model spec into a provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderSpecError {
    /// Model spec is not in `<provider>/<model>` format.
    #[error("invalid model spec '{spec}', expected '<provider>/<model>'")]
    InvalidModelSpec {
        /// Invalid raw spec.
        spec: String,
    },
    /// Unsupported provider type in spec prefix.
    #[error("unsupported provider '{provider}'")]
    UnsupportedProvider {
        /// Unsupported provider prefix.
        provider: String,
    },
    /// The configured API key variable is not set.
    #[error("environment variable '{var}' named by model.api_key_env is not set")]
    MissingApiKey {
        /// Variable name.
        var: String,
    },
    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// HTTP helpers (useful for all providers)
// ---------------------------------------------------------------------------

/// Check HTTP response status and return body text or a structured error.
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure, `ProviderError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

/// Collapse whitespace, redact bearer-style keys, and cap the length of an
/// error body before it reaches logs.
#[doc(hidden)]
pub fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [r"sk-[A-Za-z0-9_\-]{16,}", r"Bearer\s+[A-Za-z0-9._\-]{16,}"] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Core LLM provider interface.
///
/// Implementations must be `Send + Sync` so one provider can serve many
/// concurrent batch requests.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Request a completion from the LLM.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on API, network, or parse failure.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;

    /// The model spec string this provider is instantiated for.
    fn model_id(&self) -> &str;

    /// Check whether the backing server answers at all.
    async fn is_available(&self) -> bool {
        true
    }

    /// Send a single-turn prompt and return the reply text.
    ///
    /// Every call is an independent conversation; nothing carries over
    /// between prompts.
    ///
    /// # Errors
    ///
    /// Propagates any [`ProviderError`] from [`LlmProvider::complete`].
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<String, ProviderError> {
        let request = CompletionRequest {
            prompt: prompt.to_owned(),
            max_tokens,
            temperature,
        };
        let response = self.complete(request).await?;
        debug!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "completion received"
        );
        if response.truncated() {
            // A cut-off reply usually loses the CONFIDENCE line.
            warn!(
                model = %self.model_id(),
                max_tokens = ?max_tokens,
                "reply hit the token limit and may not parse"
            );
        }
        Ok(response.text)
    }
}

// ---------------------------------------------------------------------------
// Model specs
// ---------------------------------------------------------------------------

/// Parsed `provider/model` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// Provider prefix, e.g. `ollama`.
    pub provider: String,
    /// Model name passed to the server, e.g. `llama3.1:8b`.
    pub model: String,
}

/// Split a model spec like `"ollama/llama3.1:8b"` at the first `/`.
///
/// The model part may itself contain `/` (e.g. Hugging Face style names).
///
/// # Errors
///
/// Returns [`ProviderSpecError::InvalidModelSpec`] when either side is empty.
pub fn parse_model_spec(spec: &str) -> Result<ModelSpec, ProviderSpecError> {
    let (provider, model) = spec.split_once('/').unwrap_or((spec, ""));
    if provider.is_empty() || model.is_empty() {
        return Err(ProviderSpecError::InvalidModelSpec {
            spec: spec.to_owned(),
        });
    }
    Ok(ModelSpec {
        provider: provider.to_owned(),
        model: model.to_owned(),
    })
}

/// Build the provider described by the `[model]` config section.
///
/// `ollama/…` selects the Ollama API; `openai/…`, `lmstudio/…` and
/// `llamacpp/…` select the OpenAI-compatible API.
///
/// # Errors
///
/// Returns [`ProviderSpecError`] for malformed specs, unknown providers, a
/// missing API key variable, or an HTTP client that cannot be built.
pub fn from_model_config(config: &ModelConfig) -> Result<Arc<dyn LlmProvider>, ProviderSpecError> {
    from_model_config_with(config, |key| std::env::var(key).ok())
}

/// [`from_model_config`] with an injected env resolver (for testing).
#[doc(hidden)]
pub fn from_model_config_with(
    config: &ModelConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn LlmProvider>, ProviderSpecError> {
    let parsed = parse_model_spec(&config.spec)?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    match parsed.provider.as_str() {
        "ollama" => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| ollama::DEFAULT_OLLAMA_URL.to_owned());
            Ok(Arc::new(
                ollama::OllamaProvider::new(config.spec.clone(), parsed.model)
                    .with_base_url(base_url)
                    .with_client(client),
            ))
        }
        "openai" | "lmstudio" | "llamacpp" => {
            let api_key = match &config.api_key_env {
                Some(var) => Some(env(var).ok_or_else(|| ProviderSpecError::MissingApiKey {
                    var: var.clone(),
                })?),
                None => None,
            };
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_OPENAI_COMPAT_URL.to_owned());
            Ok(Arc::new(
                openai::OpenAiCompatProvider::new(config.spec.clone(), parsed.model, api_key)
                    .with_base_url(base_url)
                    .with_client(client),
            ))
        }
        other => Err(ProviderSpecError::UnsupportedProvider {
            provider: other.to_owned(),
        }),
    }
}
