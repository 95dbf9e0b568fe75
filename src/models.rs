//! Wire types for the `/get_recommendation` endpoint and for the provider's
//! chat-completions API.
use serde::{Deserialize, Serialize};

/// Body of `POST /get_recommendation`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationRequest {
    pub dog_breed: String,
    pub diet_preference: String,
    pub product_type: String,
}

impl RecommendationRequest {
    /// Checks that every field has content once surrounding whitespace is removed.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("dog_breed", &self.dog_breed),
            ("diet_preference", &self.diet_preference),
            ("product_type", &self.product_type),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(format!("{name} must not be empty")),
            None => Ok(()),
        }
    }
}

/// Successful answer of `POST /get_recommendation`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResponse {
    pub recommendation: String,
    pub insight: String,
}

/// Request body for the provider's chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub response_format: ResponseFormat,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Asks the provider to constrain its output format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            format_type: "json_object".into(),
        }
    }
}

/// The parts of a chat-completions response we read. Everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Content of the first choice, if the provider sent one.
    pub fn first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
    }
}
