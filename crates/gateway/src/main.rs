//! Rabbit Hole server
//!
//! Entry point for the citation-graph explorer. Handles:
//! - Configuration and logging setup
//! - Prometheus recorder installation
//! - Semantic Scholar client construction
//! - Serving with graceful shutdown

use anyhow::Context;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rabbithole_common::{
    config::{AppConfig, ObservabilityConfig},
    metrics::{self, UPSTREAM_BUCKETS},
    scholar::SemanticScholarClient,
    ScholarClient,
};
use rabbithole_gateway::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.observability);
    info!("Starting Rabbit Hole v{}", rabbithole_common::VERSION);

    let prometheus = if config.observability.metrics_enabled {
        let handle = install_prometheus()?;
        metrics::register_metrics();
        Some(handle)
    } else {
        None
    };

    let scholar = SemanticScholarClient::new(&config.scholar)?;
    info!(
        base_url = %config.scholar.base_url,
        keyed = scholar.has_api_key(),
        "Semantic Scholar client ready"
    );

    let addr = config.bind_address();
    let grace = config.shutdown_timeout();

    let mut state = AppState::new(config, Arc::new(scholar))?;
    if let Some(handle) = prometheus {
        state = state.with_prometheus(handle);
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(grace))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(observability: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&observability.log_level));

    if observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("scholar_duration_seconds".to_string()),
            UPSTREAM_BUCKETS,
        )?
        .install_recorder()?;
    Ok(handle)
}

/// Graceful shutdown signal handler
///
/// In-flight requests get `grace` to finish once a signal arrives.
async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(grace_secs = grace.as_secs(), "Shutdown grace period elapsed, exiting");
        std::process::exit(1);
    });
}
