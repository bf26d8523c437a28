//! PolicyCalc API server
//!
//! HTTP REST API using Axum over the same core the CLI drives: formula
//! registry replacement, table processing, artifact download and document
//! extraction.

use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::config::ProcessingConfig;
use crate::core::registry::FormulaRegistry;
use crate::core::ProcessingSummary;

/// API Server configuration
#[derive(Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Counters of the most recent processing run
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LastRun {
    pub total_rows: usize,
    pub processed_rows: usize,
    pub successful_calculations: usize,
    pub total_errors: usize,
    pub registry_version: u64,
    pub output_filename: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl From<&ProcessingSummary> for LastRun {
    fn from(summary: &ProcessingSummary) -> Self {
        Self {
            total_rows: summary.total_rows,
            processed_rows: summary.processed_rows,
            successful_calculations: summary.successful_calculations,
            total_errors: summary.total_errors,
            registry_version: summary.registry_version,
            output_filename: summary.output_filename.clone(),
            finished_at: Utc::now(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub version: String,
    pub registry: FormulaRegistry,
    pub config: ProcessingConfig,
    last_run: RwLock<Option<LastRun>>,
}

impl AppState {
    pub fn new(config: ProcessingConfig) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            registry: FormulaRegistry::new(),
            config,
            last_run: RwLock::new(None),
        }
    }

    pub fn last_run(&self) -> Option<LastRun> {
        self.last_run
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn record_run(&self, summary: &ProcessingSummary) {
        let mut guard = self.last_run.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(LastRun::from(summary));
    }
}

/// Build the router with all routes and middleware
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Core API endpoints
        .route(
            "/api/v1/formulas",
            get(handlers::get_formulas).post(handlers::replace_formulas),
        )
        .route("/api/v1/process", post(handlers::process))
        .route("/api/v1/download/:filename", get(handlers::download))
        .route("/api/v1/extract", post(handlers::extract))
        .route("/api/v1/variables", get(handlers::variables))
        // State and middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig, state: AppState) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "policycalc=info,tower_http=info".into()),
        )
        .init();

    let formulas = state.registry.len();
    let app = router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("🧮 PolicyCalc API Server starting on http://{}", addr);
    info!("   Endpoints: /api/v1/formulas, /api/v1/process, /api/v1/download/:filename, /api/v1/extract, /api/v1/variables");
    info!("   Health: /health, Version: /version");
    info!("   Formulas loaded: {}", formulas);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("PolicyCalc API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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

    info!("Shutdown signal received, stopping server...");
}
