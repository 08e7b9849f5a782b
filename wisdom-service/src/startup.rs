//! Application startup and lifecycle management.

use crate::config::WisdomConfig;
use crate::handlers::{self, answer_question, get_quote, health_check};
use crate::services::providers::gemini::{
    GeminiConfig, GeminiEmbeddingProvider, GeminiTextProvider,
};
use crate::services::providers::pinecone::{PineconeIndex, PineconeIndexConfig};
use crate::services::providers::{EmbeddingProvider, TextProvider, VectorIndex};
use crate::services::WisdomService;
use axum::{
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
    Json, Router,
};
use service_core::error::{AppError, ErrorResponse};
use service_core::middleware::{
    cors::cors_middleware, metrics::metrics_middleware, tracing::request_id_middleware,
    tracing::REQUEST_ID_HEADER,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub wisdom: WisdomService,
}

impl AppState {
    /// Wire real upstream clients from configuration.
    pub fn from_config(config: &WisdomConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_client_timeout_secs))
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("HTTP client: {}", e)))?;

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(GeminiEmbeddingProvider::new(
            GeminiConfig {
                api_key: config.google.api_key.clone(),
                api_base: config.google.api_base.clone(),
                model: config.models.embedding_model.clone(),
            },
            client.clone(),
        ));

        let generator: Arc<dyn TextProvider> = Arc::new(GeminiTextProvider::new(
            GeminiConfig {
                api_key: config.google.api_key.clone(),
                api_base: config.google.api_base.clone(),
                model: config.models.text_model.clone(),
            },
            client.clone(),
        ));

        let index: Arc<dyn VectorIndex> = Arc::new(PineconeIndex::new(
            PineconeIndexConfig {
                api_key: config.pinecone.api_key.clone(),
                index_name: config.pinecone.index_name.clone(),
                index_host: config.pinecone.index_host.clone(),
                controller_url: config.pinecone.controller_url.clone(),
            },
            client,
        ));

        tracing::info!(
            embedding_model = %config.models.embedding_model,
            text_model = %config.models.text_model,
            index = %config.pinecone.index_name,
            namespace = %config.pinecone.namespace,
            answer_top_k = config.wisdom.answer_top_k,
            condense_quotes = config.wisdom.condense_quotes,
            "Initialized upstream providers"
        );

        Ok(Self {
            wisdom: WisdomService::new(
                embedder,
                index,
                generator,
                config.wisdom.clone(),
                config.pinecone.namespace.clone(),
            ),
        })
    }
}

async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".to_string(),
        }),
    )
}

/// Build the HTTP router. CORS is the outermost layer so every response,
/// errors and preflights included, carries the headers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/getquote", post(get_quote))
        .route("/api", post(answer_question))
        .route("/api/answer", post(answer_question))
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .fallback(not_found)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(cors_middleware))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with real upstream providers.
    pub async fn build(config: WisdomConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(&config)?;
        Self::build_with_state(config.common.port, state).await
    }

    /// Build around an existing state. Port 0 binds a random port.
    pub async fn build_with_state(port: u16, state: AppState) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Wisdom service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until Ctrl-C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}
