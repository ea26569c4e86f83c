use serde::{Deserialize, Serialize};

/// Which configured model a request runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// The cited summary.
    Summary,
    /// Direct answer, score, key facts and related questions.
    Derived,
}

/// A single system + user exchange.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub tier: ModelTier,
    pub system: String,
    pub user: String,
    /// Ask for `response_format: {"type": "json_object"}`.
    pub json: bool,
}

impl CompletionRequest {
    pub fn text(tier: ModelTier, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            tier,
            system: system.into(),
            user: user.into(),
            json: false,
        }
    }

    pub fn json(tier: ModelTier, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            json: true,
            ..Self::text(tier, system, user)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    pub messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Option<Vec<Choice>>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}
