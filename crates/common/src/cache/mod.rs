//! Memoized graph construction
//!
//! Provides:
//! - Graph memoization keyed by seed paper and limits
//! - Bounded capacity with oldest-first eviction
//! - Optional time-to-live
//!
//! The client is not part of the key: the same seed and limits always
//! produce the same graph.

use crate::errors::Result;
use crate::graph::{build_graph_with_labels, CitationGraph, GraphLimits, DEFAULT_LABEL_LENGTH};
use crate::metrics;
use crate::scholar::ScholarClient;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Graph cache configuration
#[derive(Debug, Clone)]
pub struct GraphCacheConfig {
    /// Maximum number of memoized graphs
    pub max_entries: usize,
    /// Entry lifetime; `None` keeps entries until evicted
    pub ttl: Option<Duration>,
    /// Characters kept in node labels
    pub label_length: usize,
}

impl Default for GraphCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            ttl: None,
            label_length: DEFAULT_LABEL_LENGTH,
        }
    }
}

impl From<&crate::config::AppConfig> for GraphCacheConfig {
    fn from(config: &crate::config::AppConfig) -> Self {
        Self {
            max_entries: config.cache.max_entries.max(1),
            ttl: (config.cache.ttl_secs > 0).then(|| Duration::from_secs(config.cache.ttl_secs)),
            label_length: config.graph.label_length,
        }
    }
}

/// Arguments a build is memoized on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphKey {
    pub paper_id: String,
    pub limits: GraphLimits,
}

impl GraphKey {
    pub fn new(paper_id: &str, limits: GraphLimits) -> Self {
        Self {
            paper_id: paper_id.to_string(),
            limits,
        }
    }
}

struct Entry {
    graph: Arc<CitationGraph>,
    inserted_at: Instant,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<GraphKey, Entry>,
    order: VecDeque<GraphKey>,
}

impl Inner {
    fn remove(&mut self, key: &GraphKey) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// In-process memo of built graphs
pub struct GraphCache {
    inner: RwLock<Inner>,
    config: GraphCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl GraphCache {
    pub fn new(config: GraphCacheConfig) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a memoized graph, if present and fresh
    pub async fn get(&self, key: &GraphKey) -> Option<Arc<CitationGraph>> {
        let inner = self.inner.read().await;
        let entry = inner.entries.get(key)?;

        if self.is_expired(entry) {
            return None;
        }
        Some(entry.graph.clone())
    }

    /// Memoize a graph, evicting the oldest entries beyond capacity
    pub async fn insert(&self, key: GraphKey, graph: CitationGraph) -> Arc<CitationGraph> {
        let graph = Arc::new(graph);
        let mut inner = self.inner.write().await;

        inner.remove(&key);
        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            Entry {
                graph: graph.clone(),
                inserted_at: Instant::now(),
            },
        );

        while inner.entries.len() > self.config.max_entries {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                    debug!(paper_id = %oldest.paper_id, "Evicted graph from cache");
                }
                None => break,
            }
        }

        graph
    }

    /// Return the memoized graph, or fetch the seed record and build it.
    ///
    /// Failed fetches are not memoized.
    pub async fn get_or_build(
        &self,
        client: &dyn ScholarClient,
        paper_id: &str,
        limits: GraphLimits,
    ) -> Result<Arc<CitationGraph>> {
        let key = GraphKey::new(paper_id, limits);

        if let Some(cached) = self.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache(true, "graph");
            debug!(paper_id, "Graph cache hit");
            return Ok(cached);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache(false, "graph");

        let start = Instant::now();
        let details = client.get_paper(paper_id).await?;
        let graph = build_graph_with_labels(&details, limits, self.config.label_length);

        metrics::record_graph_build(graph.nodes.len());
        info!(
            paper_id,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Citation graph built"
        );

        Ok(self.insert(key, graph).await)
    }

    /// Drop every memoized graph
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.order.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        CacheStats {
            entries: inner.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.config
            .ttl
            .is_some_and(|ttl| entry.inserted_at.elapsed() >= ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::scholar::StaticScholar;

    const TRANSFORMER: &str = "204e3073870fae3d05bcbc2f6a8e263d9b72e776";
    const BERT: &str = "df2b0e26d0599ce3e70df8a9da02e51594e0e992";

    #[tokio::test]
    async fn test_second_build_is_memoized() {
        let scholar = StaticScholar::sample();
        let cache = GraphCache::new(GraphCacheConfig::default());
        let limits = GraphLimits::new(5, 5);

        let first = cache.get_or_build(&scholar, TRANSFORMER, limits).await.unwrap();
        let second = cache.get_or_build(&scholar, TRANSFORMER, limits).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(scholar.detail_calls(), 1);

        let stats = cache.stats().await;
        assert_eq!(stats, CacheStats { entries: 1, hits: 1, misses: 1 });
    }

    #[tokio::test]
    async fn test_limits_are_part_of_the_key() {
        let scholar = StaticScholar::sample();
        let cache = GraphCache::new(GraphCacheConfig::default());

        let narrow = cache.get_or_build(&scholar, TRANSFORMER, GraphLimits::new(1, 1)).await.unwrap();
        let wide = cache.get_or_build(&scholar, TRANSFORMER, GraphLimits::new(5, 5)).await.unwrap();

        assert_eq!(narrow.nodes.len(), 3);
        assert_eq!(wide.nodes.len(), 6);
        assert_eq!(scholar.detail_calls(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_memoized() {
        let scholar = StaticScholar::sample();
        let cache = GraphCache::new(GraphCacheConfig::default());
        let limits = GraphLimits::default();

        scholar.set_failing(true);
        let err = cache.get_or_build(&scholar, TRANSFORMER, limits).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream { status: 503, .. }));

        scholar.set_failing(false);
        assert!(cache.get_or_build(&scholar, TRANSFORMER, limits).await.is_ok());
        assert_eq!(scholar.detail_calls(), 2);
    }

    #[tokio::test]
    async fn test_oldest_entry_evicted() {
        let scholar = StaticScholar::sample();
        let cache = GraphCache::new(GraphCacheConfig {
            max_entries: 1,
            ..GraphCacheConfig::default()
        });
        let limits = GraphLimits::default();

        cache.get_or_build(&scholar, TRANSFORMER, limits).await.unwrap();
        cache.get_or_build(&scholar, BERT, limits).await.unwrap();

        assert!(cache.get(&GraphKey::new(TRANSFORMER, limits)).await.is_none());
        assert!(cache.get(&GraphKey::new(BERT, limits)).await.is_some());
        assert_eq!(cache.stats().await.entries, 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let cache = GraphCache::new(GraphCacheConfig {
            ttl: Some(Duration::ZERO),
            ..GraphCacheConfig::default()
        });
        let key = GraphKey::new("p", GraphLimits::default());

        cache.insert(key.clone(), CitationGraph::default()).await;
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = GraphCache::new(GraphCacheConfig::default());
        let key = GraphKey::new("p", GraphLimits::default());
        cache.insert(key.clone(), CitationGraph::default()).await;

        cache.clear().await;
        assert!(cache.get(&key).await.is_none());
    }
}
