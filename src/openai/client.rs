use std::env;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::types::{
    ApiError, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, CompletionRequest,
    ModelTier, ResponseFormat,
};

const API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_SUMMARY_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo-1106";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("OPENAI_API_KEY not set. Create one at https://platform.openai.com/api-keys")]
    ApiKeyNotSet,

    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API returned no message content")]
    EmptyResponse,
}

/// Single-turn chat completion.
/// Implemented by `OpenAiClient` for production; mock implementations used in tests.
pub trait CompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: ApiKey,
    summary_model: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn from_env(http: Client) -> Result<Self, GenerationError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| GenerationError::ApiKeyNotSet)?;
        if api_key.trim().is_empty() {
            return Err(GenerationError::ApiKeyNotSet);
        }
        let base_url = env_or("OPENAI_BASE_URL", API_BASE)
            .trim_end_matches('/')
            .to_string();
        if !base_url.starts_with("https://") {
            warn!(%base_url, "OPENAI_BASE_URL is not HTTPS; the API key is sent in clear text");
        }
        Ok(Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            summary_model: env_or("SCHOLAR_SUMMARY_MODEL", DEFAULT_SUMMARY_MODEL),
            model: env_or("SCHOLAR_MODEL", DEFAULT_MODEL),
            base_url,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Override the configured models; `None` keeps the current value.
    pub fn with_models(mut self, summary: Option<String>, derived: Option<String>) -> Self {
        if let Some(m) = summary.filter(|m| !m.trim().is_empty()) {
            self.summary_model = m;
        }
        if let Some(m) = derived.filter(|m| !m.trim().is_empty()) {
            self.model = m;
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: base_url.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Summary => &self.summary_model,
            ModelTier::Derived => &self.model,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let model = self.model_for(request.tier);

        let body = ChatCompletionRequest {
            model,
            response_format: request.json.then_some(ResponseFormat {
                format_type: "json_object",
            }),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("OpenAI API rate limited");
            return Err(GenerationError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<ChatCompletionResponse>(&text)
                && let Some(err) = &body.error
            {
                let classified = classify_api_error(status.as_u16(), err);
                warn!(error = %classified, "OpenAI API error");
                return Err(classified);
            }
            let end = text.floor_char_boundary(200);
            warn!(status = %status, "OpenAI API error (no structured body)");
            return Err(GenerationError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {}", &text[..end]),
            });
        }

        let body: ChatCompletionResponse = response.json().await?;
        if let Some(err) = &body.error {
            let classified = classify_api_error(status.as_u16(), err);
            warn!(error = %classified, "OpenAI API error in 200 response");
            return Err(classified);
        }

        let content = body
            .choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or(GenerationError::EmptyResponse)?;

        debug!(model, chars = content.len(), "completion received");
        Ok(content)
    }
}

fn classify_api_error(status: u16, err: &ApiError) -> GenerationError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match (status, err.error_type.as_deref()) {
        (429, _) => GenerationError::RateLimited,
        (_, Some("rate_limit_exceeded")) => GenerationError::RateLimited,
        _ => GenerationError::Api {
            code: status,
            message,
        },
    }
}
