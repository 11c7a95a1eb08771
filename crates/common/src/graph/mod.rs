//! Citation graph construction
//!
//! Turns one paper's bibliographic record into a bounded node/edge set:
//! the seed paper, the first `limit_refs` papers it cites and the first
//! `limit_cites` papers citing it.

mod view;

pub use view::{BarnesHut, GraphView, Physics};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::scholar::{PaperDetails, PaperRef};
use crate::UNKNOWN_TITLE;

/// Characters kept in a node label before truncation
pub const DEFAULT_LABEL_LENGTH: usize = 30;

pub const SEED_COLOR: &str = "#FF4B4B";
pub const REFERENCE_COLOR: &str = "#1E88E5";
pub const CITATION_COLOR: &str = "#43A047";
pub const EDGE_COLOR: &str = "#BDC3C7";

pub const SEED_SIZE: u32 = 25;
pub const NEIGHBOR_SIZE: u32 = 15;

/// Role of a node relative to the seed paper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Seed,
    /// Cited by the seed (ancestor)
    Reference,
    /// Cites the seed (descendant)
    Citation,
}

impl NodeKind {
    pub fn color(&self) -> &'static str {
        match self {
            NodeKind::Seed => SEED_COLOR,
            NodeKind::Reference => REFERENCE_COLOR,
            NodeKind::Citation => CITATION_COLOR,
        }
    }

    pub fn size(&self) -> u32 {
        match self {
            NodeKind::Seed => SEED_SIZE,
            NodeKind::Reference | NodeKind::Citation => NEIGHBOR_SIZE,
        }
    }
}

/// A paper in the rendered graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    /// Full title, used as tooltip and as the re-seed query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub size: u32,
    pub color: String,
    pub kind: NodeKind,
}

impl Node {
    fn new(id: &str, title: Option<&str>, kind: NodeKind, label_length: usize) -> Self {
        Self {
            id: id.to_string(),
            label: clean_title(title, label_length),
            title: title.filter(|t| !t.is_empty()).map(str::to_string),
            size: kind.size(),
            color: kind.color().to_string(),
            kind,
        }
    }
}

/// A directed citation link, pointing from the older paper to the newer one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub label: String,
    pub color: String,
}

impl Edge {
    fn influenced(reference_id: &str, seed_id: &str) -> Self {
        Self {
            source: reference_id.to_string(),
            target: seed_id.to_string(),
            label: "influenced".to_string(),
            color: EDGE_COLOR.to_string(),
        }
    }

    fn sparked(seed_id: &str, citation_id: &str) -> Self {
        Self {
            source: seed_id.to_string(),
            target: citation_id.to_string(),
            label: "sparked".to_string(),
            color: EDGE_COLOR.to_string(),
        }
    }
}

/// Bounds on how many neighbors are pulled in on each side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphLimits {
    pub limit_refs: usize,
    pub limit_cites: usize,
}

impl GraphLimits {
    pub fn new(limit_refs: usize, limit_cites: usize) -> Self {
        Self { limit_refs, limit_cites }
    }

    /// Clamp both limits into `1..=max`
    pub fn clamped(self, max: usize) -> Self {
        let max = max.max(1);
        Self {
            limit_refs: self.limit_refs.clamp(1, max),
            limit_cites: self.limit_cites.clamp(1, max),
        }
    }
}

impl Default for GraphLimits {
    fn default() -> Self {
        Self::new(5, 5)
    }
}

/// Node and edge lists handed to the renderer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl CitationGraph {
    pub fn seed(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind == NodeKind::Seed)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }
}

/// Shorten a title for use as a node label.
///
/// Missing or empty titles become [`UNKNOWN_TITLE`]. Titles longer than
/// `length` characters keep their first `length` characters followed by `...`.
pub fn clean_title(title: Option<&str>, length: usize) -> String {
    let title = match title {
        Some(t) if !t.is_empty() => t,
        _ => return UNKNOWN_TITLE.to_string(),
    };

    match title.char_indices().nth(length) {
        Some((cut, _)) => format!("{}...", &title[..cut]),
        None => title.to_string(),
    }
}

/// Build the graph around `details` with the default label length.
pub fn build_graph(details: &PaperDetails, limits: GraphLimits) -> CitationGraph {
    build_graph_with_labels(details, limits, DEFAULT_LABEL_LENGTH)
}

/// Build the graph around `details`.
///
/// Each side is truncated to its limit in upstream order first; entries
/// without both an id and a title are then dropped. A paper already present
/// in the node list is not added again, but its edge is still recorded.
pub fn build_graph_with_labels(
    details: &PaperDetails,
    limits: GraphLimits,
    label_length: usize,
) -> CitationGraph {
    let seed_id = details.paper_id.as_str();
    let mut graph = CitationGraph::default();
    let mut seen: HashSet<&str> = HashSet::new();

    graph.nodes.push(Node::new(seed_id, details.title.as_deref(), NodeKind::Seed, label_length));
    seen.insert(seed_id);

    for (id, title) in kept(&details.references, limits.limit_refs) {
        if seen.insert(id) {
            graph.nodes.push(Node::new(id, Some(title), NodeKind::Reference, label_length));
        }
        graph.edges.push(Edge::influenced(id, seed_id));
    }

    for (id, title) in kept(&details.citations, limits.limit_cites) {
        if seen.insert(id) {
            graph.nodes.push(Node::new(id, Some(title), NodeKind::Citation, label_length));
        }
        graph.edges.push(Edge::sparked(seed_id, id));
    }

    graph
}

/// First `limit` entries that carry both an id and a non-empty title
fn kept<'a>(entries: &'a [PaperRef], limit: usize) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    entries.iter().take(limit).filter_map(|entry| {
        match (entry.paper_id.as_deref(), entry.title.as_deref()) {
            (Some(id), Some(title)) if !id.is_empty() && !title.is_empty() => Some((id, title)),
            _ => None,
        }
    })
}
