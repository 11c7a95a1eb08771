//! Health check handlers

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::AppState;
use rabbithole_common::{
    cache::CacheStats,
    errors::{AppError, Result},
    VERSION,
};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: ReadyChecks,
}

#[derive(Serialize)]
pub struct ReadyChecks {
    pub scholar: ScholarCheck,
    pub cache: CacheStats,
    pub sessions: usize,
}

#[derive(Serialize)]
pub struct ScholarCheck {
    /// `pro` with an API key, `free` without
    pub mode: String,
    pub base_url: String,
}

/// Liveness check - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
    })
}

/// Readiness check - reports key mode, cache counters and live sessions
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let mode = if state.scholar.has_api_key() { "pro" } else { "free" };

    Json(ReadyResponse {
        status: "ready".to_string(),
        checks: ReadyChecks {
            scholar: ScholarCheck {
                mode: mode.to_string(),
                base_url: state.config.scholar.base_url.clone(),
            },
            cache: state.cache.stats().await,
            sessions: state.sessions.len().await,
        },
    })
}

/// Prometheus scrape endpoint
pub async fn metrics(State(state): State<AppState>) -> Result<Response> {
    let handle = state.prometheus.as_ref().ok_or_else(|| AppError::NotFound {
        resource_type: "metrics".to_string(),
        id: "prometheus".to_string(),
    })?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response())
}
