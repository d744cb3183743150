//! OpenAI-compatible provider for local servers using `/v1/chat/completions`.
//!
//! LM Studio, the llama.cpp server and vLLM all speak this dialect. An API
//! key is optional; most local servers ignore it.

use serde::{Deserialize, Serialize};

use super::{
    check_http_response, CompletionRequest, CompletionResponse, LlmProvider, ProviderError,
    StopReason, UsageStats,
};

/// Default base URL (LM Studio's default port).
pub const DEFAULT_OPENAI_COMPAT_URL: &str = "http://127.0.0.1:1234";

const DEFAULT_MAX_TOKENS: u32 = 512;

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Chat completions request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<OpenAiMessage>,
    /// Maximum completion tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A message in OpenAI chat format.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiMessage {
    /// Always `user`; every request is single-turn.
    pub role: String,
    /// Plain text content.
    pub content: String,
}

/// Chat completions response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiResponse {
    /// Response choices.
    pub choices: Vec<OpenAiChoice>,
    /// Model that served the response.
    #[serde(default)]
    pub model: String,
    /// Token usage.
    pub usage: Option<OpenAiUsage>,
}

/// A response choice.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiChoice {
    /// Assistant message for this choice.
    pub message: OpenAiResponseMessage,
    /// Why generation stopped.
    pub finish_reason: Option<String>,
}

/// Assistant message.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiResponseMessage {
    /// Optional text content.
    pub content: Option<String>,
}

/// Usage statistics.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiUsage {
    /// Prompt token count.
    pub prompt_tokens: Option<u32>,
    /// Completion token count.
    pub completion_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// OpenAI-compatible chat completions provider.
#[derive(Debug, Clone)]
pub struct OpenAiCompatProvider {
    model_spec: String,
    model_name: String,
    api_key: Option<String>,
    /// Server base URL, without the `/v1` suffix.
    #[doc(hidden)]
    pub base_url: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider instance.
    pub fn new(model_spec: String, model_name: String, api_key: Option<String>) -> Self {
        Self {
            model_spec,
            model_name,
            api_key,
            base_url: DEFAULT_OPENAI_COMPAT_URL.to_owned(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the provider at a different server.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        let trimmed = base_url.trim_end_matches('/');
        self.base_url = trimmed.strip_suffix("/v1").unwrap_or(trimmed).to_owned();
        self
    }

    /// Use a preconfigured HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("authorization", format!("Bearer {key}")),
            None => builder,
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build a chat completions request from a completion request.
#[doc(hidden)]
pub fn build_request(model: &str, request: &CompletionRequest) -> OpenAiRequest {
    let messages = vec![OpenAiMessage {
        role: "user".to_owned(),
        content: request.prompt.clone(),
    }];

    OpenAiRequest {
        model: model.to_owned(),
        messages,
        max_tokens: Some(request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
        temperature: request.temperature,
    }
}

/// Parse a chat completions response.
///
/// # Errors
///
/// Returns `ProviderError::Parse` if the body cannot be deserialized or has
/// no choices.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<CompletionResponse, ProviderError> {
    let resp: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("missing choices[0]".to_owned()))?;

    let stop_reason = match choice.finish_reason.as_deref() {
        Some("stop") | None => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        Some(other) => StopReason::Other(other.to_owned()),
    };

    let usage = UsageStats {
        input_tokens: resp
            .usage
            .as_ref()
            .and_then(|u| u.prompt_tokens)
            .unwrap_or(0),
        output_tokens: resp
            .usage
            .as_ref()
            .and_then(|u| u.completion_tokens)
            .unwrap_or(0),
    };

    Ok(CompletionResponse {
        text: choice.message.content.unwrap_or_default(),
        stop_reason,
        usage,
        model: resp.model,
    })
}

// ---------------------------------------------------------------------------
// Trait impl
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let api_request = build_request(&self.model_name, &request);

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .authorized(self.client.post(&url))
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await?;

        let payload = check_http_response(response).await?;
        parse_response(&payload)
    }

    fn model_id(&self) -> &str {
        &self.model_spec
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);
        self.authorized(self.client.get(&url))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }
}
