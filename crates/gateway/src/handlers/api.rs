//! JSON API

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::info;
use validator::Validate;

use super::{session::resolve_session, validated};
use crate::AppState;
use rabbithole_common::{
    errors::Result,
    graph::{CitationGraph, GraphLimits, GraphView},
    scholar::PaperSummary,
    session::SessionView,
};

fn default_search_limit() -> usize {
    1
}

fn default_graph_limit() -> usize {
    5
}

/// Query string for `GET /api/search`
#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(min = 1, max = 500))]
    pub q: String,

    #[serde(default = "default_search_limit")]
    #[validate(range(min = 1, max = 20))]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<PaperSummary>,
    pub latency_ms: u64,
}

/// Candidate papers for a free-text query
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let params = validated(params)?;
    let start = Instant::now();

    let results = state.scholar.search_paper(params.q.trim(), params.limit).await?;

    let latency_ms = start.elapsed().as_millis() as u64;
    info!(query = %params.q, hits = results.len(), latency_ms, "Search completed");

    Ok(Json(SearchResponse {
        query: params.q,
        results,
        latency_ms,
    }))
}

/// Query string for `GET /api/papers/{paper_id}/graph`
#[derive(Debug, Deserialize, Validate)]
pub struct GraphParams {
    #[serde(default = "default_graph_limit")]
    #[validate(range(min = 1, max = 20))]
    pub limit_refs: usize,

    #[serde(default = "default_graph_limit")]
    #[validate(range(min = 1, max = 20))]
    pub limit_cites: usize,
}

#[derive(Debug, Serialize)]
pub struct GraphResponse {
    pub paper_id: String,
    pub limits: GraphLimits,
    pub node_count: usize,
    #[serde(flatten)]
    pub graph: CitationGraph,
    pub view: GraphView,
    pub options: Value,
}

/// The seed's neighborhood as nodes and edges
pub async fn paper_graph(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
    Query(params): Query<GraphParams>,
) -> Result<Json<GraphResponse>> {
    let params = validated(params)?;
    let limits =
        GraphLimits::new(params.limit_refs, params.limit_cites).clamped(state.config.graph.max_limit);

    let graph = state
        .cache
        .get_or_build(state.scholar.as_ref(), &paper_id, limits)
        .await?;

    Ok(Json(GraphResponse {
        paper_id,
        limits,
        node_count: graph.nodes.len(),
        graph: CitationGraph::clone(&graph),
        view: state.view.clone(),
        options: state.view.network_options(),
    }))
}

/// The caller's session, including a staged query that has not been rendered yet
pub async fn current_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionView>)> {
    let (session_id, jar) = resolve_session(&state, jar).await;
    let view = state.sessions.view(session_id).await?;
    Ok((jar, Json(view)))
}
