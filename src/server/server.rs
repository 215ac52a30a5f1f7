use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{handler::Handler, middleware, routing::post, Router};
use reqwest::Client;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::middleware::require_bearer;
use crate::auth::validator::{BearerValidator, TokenValidator};
use crate::broker::directline::DirectLineBroker;
use crate::broker::routes::directline_token;
use crate::config::settings::{HttpClientConfig, ServiceConfig};
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::server::static_files;
use crate::utils::constants::DIRECT_LINE_TOKEN_ROUTE;

/// Everything a request may touch. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub validator: Arc<dyn TokenValidator>,
    pub broker: Arc<DirectLineBroker>,
    pub metrics_state: MetricsState,
}

impl AppState {
    pub fn new(config: Arc<ServiceConfig>, metrics: &Metrics) -> Result<Self> {
        let client = http_client(&config.http)?;
        let validator = Arc::new(BearerValidator::new(&config.oauth, client.clone()));
        Ok(Self::with_validator(config, validator, client, metrics))
    }

    pub fn with_validator(
        config: Arc<ServiceConfig>,
        validator: Arc<dyn TokenValidator>,
        client: Client,
        metrics: &Metrics,
    ) -> Self {
        let broker = Arc::new(DirectLineBroker::new(&config.direct_line, client));
        Self {
            config,
            validator,
            broker,
            metrics_state: MetricsState::new(metrics.registry.clone()),
        }
    }
}

/// One client for the identity provider and the gateway.
pub fn http_client(config: &HttpClientConfig) -> Result<Client> {
    let mut builder = Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    builder.build().context("failed to build HTTP client")
}

/// Token route behind the bearer guard, optional metrics, static fallback.
pub fn router(state: AppState) -> Router {
    // guard the POST handler only; other methods get 405 without a token check
    let guarded = directline_token.layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    let mut app = Router::new()
        .route(DIRECT_LINE_TOKEN_ROUTE, post(guarded))
        .merge(state.metrics_state.router(&state.config.metrics));

    if let Some(dir) = &state.config.server.static_files {
        info!("Will serve static content from {}", dir.display());
        app = app.fallback_service(static_files::service(dir));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

pub async fn start(config: Arc<ServiceConfig>) -> Result<()> {
    let metrics = get_metrics().await;
    let state = AppState::new(config.clone(), metrics)?;
    let app = router(state);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    metrics.up.set(1);
    info!("REST API server is listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    metrics.up.set(0);
    info!("server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
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
    info!("shutdown signal received");
}
