//! Health check and metrics endpoint

use std::sync::Arc;
use std::time::SystemTime;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub uptime_seconds: u64,
    pub nats_connected: bool,
    pub bot_username: Option<String>,
}

/// Pipeline counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub updates_received: u64,
    pub jobs_fetched: u64,
    pub jobs_uploaded: u64,
    pub jobs_requeued: u64,
    pub errors: u64,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<RwLock<Metrics>>,
    pub start_time: SystemTime,
    pub bot_username: Option<String>,
    pub nats_connected: Arc<RwLock<bool>>,
}

impl AppState {
    pub fn new(bot_username: Option<String>) -> Self {
        Self {
            metrics: Arc::new(RwLock::new(Metrics::default())),
            start_time: SystemTime::now(),
            bot_username,
            nats_connected: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn increment_updates_received(&self) {
        self.metrics.write().await.updates_received += 1;
    }

    pub async fn increment_jobs_fetched(&self) {
        self.metrics.write().await.jobs_fetched += 1;
    }

    pub async fn increment_jobs_uploaded(&self) {
        self.metrics.write().await.jobs_uploaded += 1;
    }

    pub async fn increment_jobs_requeued(&self) {
        self.metrics.write().await.jobs_requeued += 1;
    }

    pub async fn increment_errors(&self) {
        self.metrics.write().await.errors += 1;
    }
}

async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let uptime = state.start_time.elapsed().unwrap_or_default().as_secs();
    let nats_connected = *state.nats_connected.read().await;

    let (status, status_code) = if nats_connected {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        status_code,
        Json(HealthStatus {
            status: status.to_string(),
            uptime_seconds: uptime,
            nats_connected,
            bot_username: state.bot_username.clone(),
        }),
    )
}

async fn metrics_handler(State(state): State<AppState>) -> Json<Metrics> {
    let metrics = state.metrics.read().await;
    Json(metrics.clone())
}

async fn ready_handler(State(state): State<AppState>) -> StatusCode {
    if *state.nats_connected.read().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn live_handler() -> StatusCode {
    StatusCode::OK
}

/// Create the health check router
pub fn create_health_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/ready", get(ready_handler))
        .route("/live", get(live_handler))
        .with_state(state)
}

/// Start the health check server
pub async fn start_health_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_health_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Health check server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
