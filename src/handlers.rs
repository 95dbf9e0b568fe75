//! Axum handlers for the recommendation service
use crate::AppState;
use crate::client::HttpClient;
use crate::errors::RecommendError;
use crate::models::{RecommendationRequest, RecommendationResponse};
use crate::prompt::build_prompt;
use crate::provider;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::Html,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

/// Serves the landing page from the configured index file.
#[instrument(skip(state))]
pub async fn index<T: HttpClient>(
    State(state): State<AppState<T>>,
) -> Result<Html<String>, RecommendError> {
    tokio::fs::read_to_string(state.index_path.as_path())
        .await
        .map(Html)
        .map_err(|e| {
            error!(
                "Failed to read index page {}: {}",
                state.index_path.display(),
                e
            );
            RecommendError::Unexpected(format!("failed to read index page: {e}"))
        })
}

/// `POST /get_recommendation`
#[instrument(skip(state, payload))]
pub async fn get_recommendation<T: HttpClient>(
    State(state): State<AppState<T>>,
    payload: Result<Json<RecommendationRequest>, JsonRejection>,
) -> Result<Json<RecommendationResponse>, RecommendError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected recommendation request body: {}", rejection);
        RecommendError::InvalidRequest(rejection.body_text())
    })?;

    recommend(&state, &request).await.map(Json)
}

/// Validates the request, asks the provider, and extracts the two answer fields.
pub async fn recommend<T: HttpClient>(
    state: &AppState<T>,
    request: &RecommendationRequest,
) -> Result<RecommendationResponse, RecommendError> {
    request.validate().map_err(|reason| {
        warn!("Invalid recommendation request: {}", reason);
        RecommendError::InvalidRequest(reason)
    })?;

    info!(
        "Recommendation requested for breed={:?} product_type={:?}",
        request.dog_breed.trim(),
        request.product_type.trim()
    );

    let prompt = build_prompt(request);
    debug!("Built prompt of {} bytes", prompt.len());

    let content = provider::complete(&state.http_client, &state.provider, &prompt).await?;
    parse_recommendation(&content)
}

/// Reads `recommendation` and `insight` out of the model's JSON answer.
pub fn parse_recommendation(content: &str) -> Result<RecommendationResponse, RecommendError> {
    let parsed: Value = serde_json::from_str(content).map_err(|e| {
        error!(
            "Failed to parse LLM JSON response: {}. Raw content: {}",
            e, content
        );
        RecommendError::MalformedUpstreamPayload(e.to_string())
    })?;

    let field = |key: &str| {
        parsed
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    };

    match (field("recommendation"), field("insight")) {
        (Some(recommendation), Some(insight)) => Ok(RecommendationResponse {
            recommendation,
            insight,
        }),
        _ => {
            warn!(
                "LLM response missing expected keys. Raw content: {}",
                content
            );
            Err(RecommendError::ServiceFormatViolation)
        }
    }
}
