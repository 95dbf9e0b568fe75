//! Error types for the recommendation path and for startup configuration.
//!
//! Every failure a request can hit is one variant of [`RecommendError`]. The
//! [`IntoResponse`] impl is the single place where variants become HTTP
//! statuses and `{"detail": ...}` bodies.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Detail returned when the model answered with JSON that lacks the expected keys.
pub const FORMAT_VIOLATION_DETAIL: &str =
    "Recommendation service encountered an issue. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    /// The caller's request body was unusable (bad JSON or blank fields).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider could not be reached or answered with a non-2xx status.
    #[error("Failed to connect to recommendation service. Error: {0}")]
    UpstreamUnreachable(String),

    /// The provider's body, or the completion inside it, was not the JSON we expect.
    #[error("Recommendation service received invalid data. Error: {0}")]
    MalformedUpstreamPayload(String),

    /// The completion was valid JSON but missing `recommendation` or `insight`.
    #[error("{}", FORMAT_VIOLATION_DETAIL)]
    ServiceFormatViolation,

    #[error("An unexpected server error occurred: {0}")]
    Unexpected(String),
}

impl RecommendError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RecommendError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RecommendError::UpstreamUnreachable(_)
            | RecommendError::MalformedUpstreamPayload(_)
            | RecommendError::ServiceFormatViolation
            | RecommendError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RecommendError {
    fn into_response(self) -> Response {
        let body = json!({ "detail": self.to_string() });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Fatal problems found while assembling configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "GROQ_API_KEY environment variable not set. \
         Set it in the environment, a .env file, or pass --api-key."
    )]
    MissingApiKey,

    #[error("Invalid provider url '{url}': {reason}")]
    InvalidProviderUrl { url: String, reason: String },
}
