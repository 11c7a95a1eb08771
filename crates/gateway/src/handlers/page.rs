//! The explorer page
//!
//! One `GET /` is one render pass over the caller's session.

use axum::{extract::State, response::Html};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{info, warn};

use super::session::resolve_session;
use crate::AppState;
use rabbithole_common::{
    errors::Result,
    graph::{CitationGraph, Edge, GraphLimits, Node},
    scholar::PaperSummary,
    session::{QueryPhase, RenderSnapshot},
    UNKNOWN_TITLE,
};

/// Characters of abstract shown under the candidate
const ABSTRACT_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Serialize)]
struct PageContext {
    query: String,
    keyed: bool,
    session_key: bool,
    limits: GraphLimits,
    max_limit: usize,
    search_error: Option<String>,
    no_results: bool,
    candidate: Option<Candidate>,
    graph_error: Option<String>,
    graph: Option<GraphPanel>,
}

#[derive(Debug, Serialize)]
struct Candidate {
    paper_id: String,
    title: String,
    year: Option<i32>,
    abstract_preview: Option<String>,
    confirmed: bool,
}

impl Candidate {
    fn new(paper: &PaperSummary, confirmed: bool) -> Self {
        Self {
            paper_id: paper.paper_id.clone(),
            title: paper.title.clone().unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            year: paper.year,
            abstract_preview: paper.abstract_preview(ABSTRACT_PREVIEW_CHARS),
            confirmed,
        }
    }
}

#[derive(Debug, Serialize)]
struct GraphPanel {
    node_count: usize,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    options: Value,
    width: String,
    height: u32,
}

/// Render the explorer for the caller's session
pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Result<(CookieJar, Html<String>)> {
    let (session_id, jar) = resolve_session(&state, jar).await;

    let snapshot = state
        .sessions
        .with_session(session_id, |session| session.begin_render())
        .await?;

    let context = build_context(&state, &snapshot).await;

    state
        .sessions
        .with_session(session_id, |session| session.end_render())
        .await?;

    let html = state.templates.render_page(&context)?;
    Ok((jar, Html(html)))
}

async fn build_context(state: &AppState, snapshot: &RenderSnapshot) -> PageContext {
    let scholar = state.scholar_for(snapshot.api_key.as_deref()).await;

    let mut context = PageContext {
        query: snapshot.query.clone(),
        keyed: scholar.has_api_key(),
        session_key: snapshot.api_key.is_some(),
        limits: snapshot.limits,
        max_limit: state.config.graph.max_limit,
        search_error: None,
        no_results: false,
        candidate: None,
        graph_error: None,
        graph: None,
    };

    if snapshot.phase == QueryPhase::Empty {
        return context;
    }

    let paper = match scholar.search_paper(&snapshot.query, 1).await {
        Ok(hits) => match hits.into_iter().next() {
            Some(paper) => paper,
            None => {
                info!(query = %snapshot.query, "No papers found");
                context.no_results = true;
                return context;
            }
        },
        Err(e) => {
            warn!(query = %snapshot.query, error = %e, "Search failed");
            context.search_error = Some(e.to_string());
            return context;
        }
    };

    let confirmed = snapshot.phase == QueryPhase::Confirmed;
    context.candidate = Some(Candidate::new(&paper, confirmed));
    if !confirmed {
        return context;
    }

    let start = Instant::now();
    match state
        .cache
        .get_or_build(scholar.as_ref(), &paper.paper_id, snapshot.limits)
        .await
    {
        Ok(graph) => {
            info!(
                paper_id = %paper.paper_id,
                nodes = graph.nodes.len(),
                edges = graph.edges.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Graph ready"
            );
            context.graph = Some(panel(state, &graph));
        }
        Err(e) => {
            warn!(paper_id = %paper.paper_id, error = %e, "Graph build failed");
            context.graph_error = Some(e.to_string());
        }
    }

    context
}

fn panel(state: &AppState, graph: &CitationGraph) -> GraphPanel {
    GraphPanel {
        node_count: graph.nodes.len(),
        nodes: graph.nodes.clone(),
        edges: graph.edges.clone(),
        options: state.view.network_options(),
        width: state.view.css_width(),
        height: state.view.height,
    }
}
