//! Rabbit Hole Common Library
//!
//! Shared code for the Rabbit Hole explorer including:
//! - Semantic Scholar client abstraction
//! - Citation graph construction
//! - Memoizing graph cache
//! - Session state with query staging
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod cache;
pub mod config;
pub mod errors;
pub mod graph;
pub mod metrics;
pub mod scholar;
pub mod session;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use graph::{CitationGraph, GraphLimits};
pub use scholar::ScholarClient;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Semantic Scholar Graph API endpoint
pub const DEFAULT_SCHOLAR_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

/// Label shown for papers without a usable title
pub const UNKNOWN_TITLE: &str = "Unknown Title";
