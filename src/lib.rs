//! dogrec - LLM-backed dog product recommendations
//!
//! This library exposes a small HTTP service: callers describe a dog (breed, diet preference,
//! desired product type), the service turns that into a prompt for a hosted chat-completions
//! provider, and relays the model's two-field JSON answer back.

use axum::Router;
use axum::routing::{get, post};
use axum_prometheus::{
    GenericMetricLayer, Handle, PrometheusMetricLayerBuilder,
    metrics_exporter_prometheus::PrometheusHandle,
};
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

pub mod client;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod prompt;
pub mod provider;

use client::{HttpClient, HyperClient, PoolOptions};
use handlers::{get_recommendation, index};
use provider::ProviderConfig;

pub const DEFAULT_INDEX_PATH: &str = "templates/index.html";

/// The main application state: the outbound HTTP client plus configuration loaded at startup.
#[derive(Clone, Debug)]
pub struct AppState<T: HttpClient> {
    pub http_client: T,
    pub provider: Arc<ProviderConfig>,
    pub index_path: Arc<PathBuf>,
}

impl AppState<HyperClient> {
    /// Create a new AppState with the default Hyper client
    pub fn new(provider: ProviderConfig, index_path: impl Into<PathBuf>, pool: PoolOptions) -> Self {
        let http_client = client::create_hyper_client(pool);
        Self::with_client(provider, index_path, http_client)
    }
}

impl<T: HttpClient> AppState<T> {
    /// Create a new AppState with a custom HTTP client (useful for testing)
    pub fn with_client(
        provider: ProviderConfig,
        index_path: impl Into<PathBuf>,
        http_client: T,
    ) -> Self {
        Self {
            http_client,
            provider: Arc::new(provider),
            index_path: Arc::new(index_path.into()),
        }
    }
}

/// Build the main router
/// This creates routes for:
/// - `/` - The landing page
/// - `/get_recommendation` - Recommendation requests
#[instrument(skip(state))]
pub fn build_router<T: HttpClient + Clone + Send + Sync + 'static>(state: AppState<T>) -> Router {
    info!("Building router");
    Router::new()
        .route("/", get(index::<T>))
        .route("/get_recommendation", post(get_recommendation::<T>))
        .with_state(state)
}

/// Builds a router for the metrics endpoint.
#[instrument(skip(handle))]
pub fn build_metrics_router(handle: PrometheusHandle) -> Router {
    info!("Building metrics router");
    Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

type MetricsLayerAndHandle = (
    GenericMetricLayer<'static, PrometheusHandle, Handle>,
    PrometheusHandle,
);

/// Builds a layer and handle for prometheus metrics collection.
///
/// `prefix` is prepended to every metric name; it must live for the whole program, hence
/// `Cow<'static, str>`.
pub fn build_metrics_layer_and_handle(
    prefix: impl Into<Cow<'static, str>>,
) -> MetricsLayerAndHandle {
    info!("Building metrics layer");
    PrometheusMetricLayerBuilder::new()
        .with_prefix(prefix)
        .enable_response_body_size(true)
        .with_endpoint_label_type(axum_prometheus::EndpointLabel::Exact)
        .with_default_metrics()
        .build_pair()
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use std::io::Write as _;
    use test_utils::MockHttpClient;

    fn test_provider() -> ProviderConfig {
        ProviderConfig::builder()
            .api_key("gsk-test-key")
            .url("https://api.example.com/openai/v1/chat/completions".parse().unwrap())
            .build()
    }

    fn server_with(client: MockHttpClient) -> TestServer {
        let app_state = AppState::with_client(test_provider(), DEFAULT_INDEX_PATH, client);
        TestServer::new(build_router(app_state)).unwrap()
    }

    fn labrador_request() -> serde_json::Value {
        json!({
            "dog_breed": "Labrador",
            "diet_preference": "grain-free",
            "product_type": "food"
        })
    }

    #[tokio::test]
    async fn test_successful_recommendation() {
        let mock_client =
            MockHttpClient::completion(r#"{"recommendation":"R","insight":"I"}"#);
        let server = server_with(mock_client.clone());

        let response = server
            .post("/get_recommendation")
            .json(&labrador_request())
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(
            response.json::<serde_json::Value>(),
            json!({"recommendation": "R", "insight": "I"})
        );
        assert_eq!(mock_client.get_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_prompt_contains_trimmed_fields() {
        let mock_client =
            MockHttpClient::completion(r#"{"recommendation":"R","insight":"I"}"#);
        let server = server_with(mock_client.clone());

        let response = server
            .post("/get_recommendation")
            .json(&json!({
                "dog_breed": "   Border Collie  ",
                "diet_preference": "high-protein",
                "product_type": "\tpuzzle toy \n"
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let requests = mock_client.get_requests();
        assert_eq!(requests.len(), 1);
        let prompt = requests[0].prompt();
        assert!(prompt.contains("Dog Breed: Border Collie\n"));
        assert!(prompt.contains("high-protein"));
        assert!(prompt.contains("Desired Product Type: puzzle toy\n"));
        assert!(!prompt.contains("   Border Collie"));
        assert!(!prompt.contains("\tpuzzle toy"));
    }

    #[tokio::test]
    async fn test_outbound_request_details() {
        let mock_client =
            MockHttpClient::completion(r#"{"recommendation":"R","insight":"I"}"#);
        let server = server_with(mock_client.clone());

        let response = server
            .post("/get_recommendation")
            .json(&labrador_request())
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let requests = mock_client.get_requests();
        let request = &requests[0];
        assert_eq!(request.method, "POST");
        assert_eq!(
            request.uri,
            "https://api.example.com/openai/v1/chat/completions"
        );
        assert_eq!(request.header("authorization"), Some("Bearer gsk-test-key"));
        assert_eq!(request.header("content-type"), Some("application/json"));

        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["model"], "llama3-8b-8192");
        assert_eq!(body["response_format"], json!({"type": "json_object"}));
    }

    #[tokio::test]
    async fn test_missing_insight_is_500() {
        let server = server_with(MockHttpClient::completion(r#"{"recommendation":"R"}"#));

        let response = server
            .post("/get_recommendation")
            .json(&labrador_request())
            .await;

        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert_eq!(
            body["detail"],
            "Recommendation service encountered an issue. Please try again."
        );
        assert!(body.get("insight").is_none());
        assert!(body.get("recommendation").is_none());
    }

    #[tokio::test]
    async fn test_network_error_is_500_and_server_keeps_serving() {
        let server = server_with(MockHttpClient::failing("tcp connect error: Connection refused"));

        for _ in 0..2 {
            let response = server
                .post("/get_recommendation")
                .json(&labrador_request())
                .await;

            assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            let body: serde_json::Value = response.json();
            let detail = body["detail"].as_str().unwrap();
            assert!(detail.contains("Failed to connect to recommendation service"));
            assert!(detail.contains("Connection refused"));
        }
    }

    #[tokio::test]
    async fn test_upstream_error_status_is_500() {
        let server = server_with(MockHttpClient::new(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "rate limited"}}"#,
        ));

        let response = server
            .post("/get_recommendation")
            .json(&labrador_request())
            .await;

        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert!(
            body["detail"]
                .as_str()
                .unwrap()
                .contains("Failed to connect to recommendation service")
        );
    }

    #[tokio::test]
    async fn test_non_json_content_is_500() {
        let server = server_with(MockHttpClient::completion("I recommend kibble."));

        let response = server
            .post("/get_recommendation")
            .json(&labrador_request())
            .await;

        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert!(
            body["detail"]
                .as_str()
                .unwrap()
                .contains("received invalid data")
        );
    }

    #[tokio::test]
    async fn test_blank_field_is_rejected_without_provider_call() {
        let mock_client =
            MockHttpClient::completion(r#"{"recommendation":"R","insight":"I"}"#);
        let server = server_with(mock_client.clone());

        let response = server
            .post("/get_recommendation")
            .json(&json!({
                "dog_breed": "   ",
                "diet_preference": "grain-free",
                "product_type": "food"
            }))
            .await;

        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = response.json();
        assert_eq!(body["detail"], "Invalid request: dog_breed must not be empty");
        assert!(mock_client.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_field_is_rejected_with_detail() {
        let mock_client =
            MockHttpClient::completion(r#"{"recommendation":"R","insight":"I"}"#);
        let server = server_with(mock_client.clone());

        let response = server
            .post("/get_recommendation")
            .json(&json!({"dog_breed": "Pug"}))
            .await;

        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = response.json();
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid request:"));
        assert!(mock_client.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_routes_and_methods() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let app_state = AppState::with_client(
            test_provider(),
            DEFAULT_INDEX_PATH,
            MockHttpClient::new(StatusCode::OK, "{}"),
        );
        let router = build_router(app_state);

        let request = Request::builder()
            .uri("/v1/chat/completions")
            .method("POST")
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let request = Request::builder()
            .uri("/get_recommendation")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_index_serves_html() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<html><body>Dog recommender</body></html>").unwrap();

        let app_state = AppState::with_client(
            test_provider(),
            file.path(),
            MockHttpClient::new(StatusCode::OK, "{}"),
        );
        let server = TestServer::new(build_router(app_state)).unwrap();

        let response = server.get("/").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(response.text().contains("Dog recommender"));
        assert!(
            response
                .header("content-type")
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );
    }

    #[tokio::test]
    async fn test_index_missing_file_is_500() {
        let app_state = AppState::with_client(
            test_provider(),
            "/nonexistent/dogrec/index.html",
            MockHttpClient::new(StatusCode::OK, "{}"),
        );
        let server = TestServer::new(build_router(app_state)).unwrap();

        let response = server.get("/").await;
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert!(body["detail"].is_string());
    }
}
