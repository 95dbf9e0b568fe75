//! Configuration parsing and validation for the recommendation server
//!
//! This module handles command-line and environment parsing using clap, and turns the
//! result into the provider settings handed to the application state.
use clap::Parser;
use dogrec::{
    DEFAULT_INDEX_PATH,
    client::PoolOptions,
    errors::ConfigError,
    provider::{DEFAULT_PROVIDER_URL, ProviderConfig},
};
use std::{path::PathBuf, time::Duration};

#[derive(Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// API key for the completion provider.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// The port on which the server will listen.
    #[arg(short = 'p', long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Chat-completions endpoint of the provider.
    #[arg(long, env = "PROVIDER_URL", default_value = DEFAULT_PROVIDER_URL)]
    pub provider_url: String,

    /// HTML page served at `/`.
    #[arg(long, env = "INDEX_PATH", default_value = DEFAULT_INDEX_PATH)]
    pub index: PathBuf,

    /// The port on which the metrics server will listen.
    #[arg(long, default_value_t = 9090)]
    pub metrics_port: u16,

    /// Whether to enable the metrics endpoint.
    #[arg(short = 'm', long, default_value_t = true, action = clap::ArgAction::Set)]
    pub metrics: bool,

    /// The prefix to use for metrics.
    #[arg(long, default_value = "dogrec")]
    pub metrics_prefix: String,

    /// Maximum number of idle HTTP connections to keep alive to the provider.
    #[arg(long, default_value_t = 100)]
    pub pool_max_idle_per_host: usize,

    /// How long (in seconds) to keep idle HTTP connections alive.
    #[arg(long, default_value_t = 90)]
    pub pool_idle_timeout_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("port", &self.port)
            .field("provider_url", &self.provider_url)
            .field("index", &self.index)
            .field("metrics_port", &self.metrics_port)
            .field("metrics", &self.metrics)
            .field("metrics_prefix", &self.metrics_prefix)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("pool_idle_timeout_secs", &self.pool_idle_timeout_secs)
            .finish()
    }
}

/// Everything `main` needs once the raw config has been checked.
#[derive(Debug)]
pub struct Validated {
    pub config: Config,
    pub provider: ProviderConfig,
}

impl Config {
    pub fn validate(self) -> Result<Validated, ConfigError> {
        let provider = ProviderConfig::from_settings(self.api_key.as_deref(), &self.provider_url)?;
        Ok(Validated {
            config: self,
            provider,
        })
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            idle_timeout: Duration::from_secs(self.pool_idle_timeout_secs),
            max_idle_per_host: self.pool_max_idle_per_host,
        }
    }
}
