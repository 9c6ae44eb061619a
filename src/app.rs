//! Application wiring: builds the dispatcher, the optional usage store and
//! the HTTP router from configuration or from injected services.

use crate::ai::{GeminiClient, GenerativeService};
use crate::api::{self, AppState};
use crate::dispatch::FallbackDispatcher;
use crate::models::Config;
use crate::usage::{S3UsageStore, UsageStore};
use crate::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub struct App {
    state: AppState,
    max_upload_bytes: usize,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub generative: Arc<dyn GenerativeService>,
    pub usage: Option<Arc<dyn UsageStore>>,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(
        services: AppServices,
        candidate_models: Vec<String>,
        max_upload_bytes: usize,
    ) -> Self {
        let dispatcher = FallbackDispatcher::new(services.generative, candidate_models);
        Self {
            state: AppState {
                dispatcher: Arc::new(dispatcher),
                usage: services.usage,
            },
            max_upload_bytes,
        }
    }

    /// Construct an app from environment configuration (`Config::from_env`).
    pub async fn new() -> Result<Self> {
        let config = Config::from_env()?;
        Ok(Self::from_config(&config).await)
    }

    pub async fn from_config(config: &Config) -> Self {
        info!(
            "Candidate models: {} (timeout {:?} per attempt)",
            config.candidate_models.join(", "),
            config.attempt_timeout
        );
        let generative = GeminiClient::new(config.gemini_api_key.clone(), config.attempt_timeout)
            .with_base_url(config.gemini_base_url.clone());

        let usage: Option<Arc<dyn UsageStore>> = match &config.usage_store {
            Some(store_config) => match S3UsageStore::new(store_config).await {
                Ok(store) => {
                    info!("Usage log enabled (bucket: {})", store_config.bucket);
                    Some(Arc::new(store))
                }
                Err(e) => {
                    warn!("Usage store unavailable, logging disabled: {}", e);
                    None
                }
            },
            None => {
                info!("USAGE_STORE_BUCKET not set; usage logging disabled");
                None
            }
        };

        Self::with_services(
            AppServices {
                generative: Arc::new(generative),
                usage,
            },
            config.candidate_models.clone(),
            config.max_upload_bytes,
        )
    }

    pub fn router(&self) -> Router {
        api::router(self.state.clone(), self.max_upload_bytes)
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
