mod config;

use clap::Parser as _;
use config::Config;
use dogrec::{AppState, build_metrics_layer_and_handle, build_metrics_router, build_router};
use tokio::net::TcpListener;
use tracing::{info, instrument};

#[tokio::main]
#[instrument]
pub async fn main() -> anyhow::Result<()> {
    // A .env file is optional; real environment variables take precedence.
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let validated = Config::parse().validate()?;
    let config = validated.config;
    info!("Starting recommender with config: {:?}", config);

    let app_state = AppState::new(validated.provider, &config.index, config.pool_options());
    let mut router = build_router(app_state);

    if config.metrics {
        let (metrics_layer, metrics_handle) =
            build_metrics_layer_and_handle(config.metrics_prefix.clone());
        router = router.layer(metrics_layer);

        let metrics_addr = format!("0.0.0.0:{}", config.metrics_port);
        let metrics_listener = TcpListener::bind(&metrics_addr).await?;
        info!("Metrics listening on {}", metrics_addr);
        tokio::spawn(async move {
            if let Err(e) =
                axum::serve(metrics_listener, build_metrics_router(metrics_handle)).await
            {
                tracing::error!("Metrics server failed: {}", e);
            }
        });
    }

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Recommender listening on {}", bind_addr);

    axum::serve(listener, router).await?;

    Ok(())
}
