//! Shared application state

use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use rabbithole_common::{
    cache::{GraphCache, GraphCacheConfig},
    config::{AppConfig, ScholarConfig},
    errors::Result,
    graph::GraphView,
    scholar::SemanticScholarClient,
    session::SessionStore,
    ScholarClient,
};

use crate::middleware::rate_limit::InboundLimiter;
use crate::render::Templates;

/// Upper bound on distinct per-session keys holding a client
const MAX_KEYED_CLIENTS: usize = 64;

/// Builds a scholar client for a user-supplied API key
pub type ClientFactory = Arc<dyn Fn(&str) -> Result<Arc<dyn ScholarClient>> + Send + Sync>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Client used when the session carries no key of its own
    pub scholar: Arc<dyn ScholarClient>,
    pub cache: Arc<GraphCache>,
    pub sessions: Arc<SessionStore>,
    pub templates: Arc<Templates>,
    pub view: GraphView,
    pub limiter: Option<InboundLimiter>,
    pub prometheus: Option<PrometheusHandle>,
    keyed_clients: Arc<RwLock<HashMap<String, Arc<dyn ScholarClient>>>>,
    client_factory: ClientFactory,
}

impl AppState {
    pub fn new(config: AppConfig, scholar: Arc<dyn ScholarClient>) -> anyhow::Result<Self> {
        let cache = GraphCache::new(GraphCacheConfig::from(&config));
        let sessions = SessionStore::new(
            config.session.ttl_minutes,
            config.graph.default_limits().clamped(config.graph.max_limit),
        );
        let limiter = config.rate_limit.enabled.then(|| {
            InboundLimiter::new(config.rate_limit.requests_per_second, config.rate_limit.burst)
        });
        let client_factory = semantic_scholar_factory(config.scholar.clone());

        Ok(Self {
            config: Arc::new(config),
            scholar,
            cache: Arc::new(cache),
            sessions: Arc::new(sessions),
            templates: Arc::new(Templates::new()?),
            view: GraphView::default(),
            limiter,
            prometheus: None,
            keyed_clients: Arc::new(RwLock::new(HashMap::new())),
            client_factory,
        })
    }

    /// Expose the given recorder on `/metrics`
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Replace how per-session keyed clients are built
    pub fn with_client_factory(mut self, factory: ClientFactory) -> Self {
        self.client_factory = factory;
        self
    }

    /// The client for a session: one built for its key, or the shared client
    pub async fn scholar_for(&self, api_key: Option<&str>) -> Arc<dyn ScholarClient> {
        let Some(key) = api_key else {
            return self.scholar.clone();
        };

        if let Some(client) = self.keyed_clients.read().await.get(key) {
            return client.clone();
        }

        let client = match (self.client_factory)(key) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Failed to build keyed client, using shared client");
                return self.scholar.clone();
            }
        };

        let mut clients = self.keyed_clients.write().await;
        if clients.len() >= MAX_KEYED_CLIENTS {
            clients.clear();
        }
        info!(clients = clients.len() + 1, "Keyed Semantic Scholar client created");
        clients.entry(key.to_string()).or_insert(client).clone()
    }
}

fn semantic_scholar_factory(base: ScholarConfig) -> ClientFactory {
    Arc::new(move |key: &str| -> Result<Arc<dyn ScholarClient>> {
        let config = ScholarConfig {
            api_key: Some(key.to_string()),
            ..base.clone()
        };
        Ok(Arc::new(SemanticScholarClient::new(&config)?) as Arc<dyn ScholarClient>)
    })
}
