//! Bibliographic data client abstraction
//!
//! Provides a unified interface over:
//! - The Semantic Scholar Graph API (keyed or anonymous)
//! - A static in-memory catalogue for tests and offline runs

mod client;
mod models;
mod static_catalogue;

pub use client::SemanticScholarClient;
pub use models::{Author, PaperDetails, PaperRef, PaperSummary};
pub use static_catalogue::StaticScholar;

use crate::errors::Result;
use async_trait::async_trait;

/// Fields requested for a seed paper
pub const DETAIL_FIELDS: &[&str] = &[
    "title",
    "authors",
    "year",
    "references.title",
    "references.paperId",
    "citations.title",
    "citations.paperId",
];

/// Fields requested for search hits
pub const SEARCH_FIELDS: &[&str] = &["paperId", "title", "year", "abstract"];

/// Trait for bibliographic lookups
#[async_trait]
pub trait ScholarClient: Send + Sync {
    /// Relevance-ranked title search
    async fn search_paper(&self, query: &str, limit: usize) -> Result<Vec<PaperSummary>>;

    /// Fetch a paper with its references and citations in upstream order
    async fn get_paper(&self, paper_id: &str) -> Result<PaperDetails>;

    /// Whether requests are authenticated with an API key
    fn has_api_key(&self) -> bool;
}
