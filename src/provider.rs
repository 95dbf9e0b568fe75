//! Adapter for the upstream chat-completions provider.
//!
//! [`ProviderConfig`] is built once at startup and carried in the application state.
//! [`complete`] performs exactly one POST per call and hands back the raw completion
//! text; interpreting that text is the handler's job.
use axum::{
    body::Body,
    extract::Request,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use bon::Builder;
use tracing::{debug, error, instrument};
use url::Url;

use crate::client::HttpClient;
use crate::errors::{ConfigError, RecommendError};
use crate::models::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ResponseFormat};

pub const DEFAULT_PROVIDER_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Upper bound on how much of the provider's body we buffer.
const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;
/// How much of a provider error body ends up in the error detail.
const ERROR_EXCERPT_BYTES: usize = 512;

/// Bearer token for the provider. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Where and how completions are requested.
#[derive(Debug, Clone, Builder)]
pub struct ProviderConfig {
    #[builder(into)]
    pub api_key: ApiKey,
    #[builder(default = Url::parse(DEFAULT_PROVIDER_URL).expect("default provider url is valid"))]
    pub url: Url,
    #[builder(into, default = DEFAULT_MODEL.to_owned())]
    pub model: String,
    #[builder(default = DEFAULT_TEMPERATURE)]
    pub temperature: f32,
}

impl ProviderConfig {
    /// Assembles the provider config from startup settings. A missing or blank key is fatal.
    pub fn from_settings(api_key: Option<&str>, url: &str) -> Result<Self, ConfigError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        let url = Url::parse(url).map_err(|e| ConfigError::InvalidProviderUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self::builder().api_key(api_key).url(url).build())
    }
}

/// Sends `prompt` as a single user message and returns the first choice's content.
#[instrument(skip(client, provider, prompt), fields(model = %provider.model, url = %provider.url))]
pub async fn complete<T: HttpClient>(
    client: &T,
    provider: &ProviderConfig,
    prompt: &str,
) -> Result<String, RecommendError> {
    let payload = ChatCompletionRequest {
        model: provider.model.clone(),
        messages: vec![ChatMessage::user(prompt)],
        response_format: ResponseFormat::json_object(),
        temperature: provider.temperature,
    };
    let body = serde_json::to_vec(&payload)
        .map_err(|e| RecommendError::Unexpected(format!("failed to encode payload: {e}")))?;

    let req = Request::builder()
        .method(Method::POST)
        .uri(provider.url.as_str())
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {}", provider.api_key.expose()))
        .body(Body::from(body))
        .map_err(|e| RecommendError::Unexpected(format!("failed to build request: {e}")))?;

    debug!("Sending completion request");
    let response = client.request(req).await.map_err(|e| {
        error!("Provider call to {} failed: {}", provider.url, e);
        RecommendError::UpstreamUnreachable(e.to_string())
    })?;

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), MAX_RESPONSE_BYTES)
        .await
        .map_err(|e| {
            error!("Failed to read provider response body: {}", e);
            RecommendError::UpstreamUnreachable(format!("failed to read response body: {e}"))
        })?;

    if !status.is_success() {
        let excerpt = String::from_utf8_lossy(&bytes[..bytes.len().min(ERROR_EXCERPT_BYTES)]);
        error!("Provider returned {}: {}", status, excerpt);
        return Err(RecommendError::UpstreamUnreachable(format!(
            "provider returned {status}: {excerpt}"
        )));
    }

    let completion: ChatCompletionResponse = serde_json::from_slice(&bytes).map_err(|e| {
        error!("Provider response is not a chat completion: {}", e);
        RecommendError::MalformedUpstreamPayload(e.to_string())
    })?;

    completion.first_content().ok_or_else(|| {
        error!("Provider response has no message content in its first choice");
        RecommendError::MalformedUpstreamPayload(
            "response has no choices[0].message.content".into(),
        )
    })
}
