//! Configuration management for Rabbit Hole
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::graph::GraphLimits;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Semantic Scholar client configuration
    #[serde(default)]
    pub scholar: ScholarConfig,

    /// Graph construction bounds
    #[serde(default)]
    pub graph: GraphConfig,

    /// Graph cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScholarConfig {
    /// Graph API base URL
    #[serde(default = "default_scholar_base_url")]
    pub base_url: String,

    /// API key (falls back to SEMANTIC_SCHOLAR_API_KEY)
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_scholar_timeout")]
    pub timeout_secs: u64,

    /// Outbound request budget without a key
    #[serde(default = "default_anonymous_rps")]
    pub requests_per_second: u32,

    /// Outbound request budget with a key
    #[serde(default = "default_keyed_rps")]
    pub keyed_requests_per_second: u32,

    /// Give up retrying transient failures after this long
    #[serde(default = "default_retry_max_elapsed")]
    pub retry_max_elapsed_secs: u64,

    /// User agent sent upstream
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphConfig {
    /// Default number of references kept
    #[serde(default = "default_limit")]
    pub default_refs: usize,

    /// Default number of citations kept
    #[serde(default = "default_limit")]
    pub default_cites: usize,

    /// Upper bound accepted for either limit
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Characters kept in node labels
    #[serde(default = "default_label_length")]
    pub label_length: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Maximum memoized graphs
    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,

    /// Entry lifetime in seconds (0 keeps entries until evicted)
    #[serde(default)]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Idle lifetime in minutes
    #[serde(default = "default_session_ttl")]
    pub ttl_minutes: i64,

    /// Cookie carrying the session id
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Expose Prometheus metrics on /metrics
    #[serde(default = "default_enabled")]
    pub metrics_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8501 }
fn default_request_timeout() -> u64 { 60 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_scholar_base_url() -> String { crate::DEFAULT_SCHOLAR_BASE_URL.to_string() }
fn default_scholar_timeout() -> u64 { 30 }
fn default_anonymous_rps() -> u32 { 1 }
fn default_keyed_rps() -> u32 { 10 }
fn default_retry_max_elapsed() -> u64 { 20 }
fn default_user_agent() -> String { format!("rabbithole/{}", crate::VERSION) }
fn default_limit() -> usize { 5 }
fn default_max_limit() -> usize { 20 }
fn default_label_length() -> usize { 30 }
fn default_cache_entries() -> usize { 256 }
fn default_session_ttl() -> i64 { 30 }
fn default_cookie_name() -> String { "rabbithole_session".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }
fn default_enabled() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            base_url: default_scholar_base_url(),
            api_key: None,
            timeout_secs: default_scholar_timeout(),
            requests_per_second: default_anonymous_rps(),
            keyed_requests_per_second: default_keyed_rps(),
            retry_max_elapsed_secs: default_retry_max_elapsed(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_refs: default_limit(),
            default_cites: default_limit(),
            max_limit: default_max_limit(),
            label_length: default_label_length(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_entries(),
            ttl_secs: 0,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_session_ttl(),
            cookie_name: default_cookie_name(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_enabled: default_enabled(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl ScholarConfig {
    /// Configured key, or the conventional environment variable
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("SEMANTIC_SCHOLAR_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Outbound request budget for the given key mode
    pub fn requests_per_second(&self, keyed: bool) -> u32 {
        if keyed {
            self.keyed_requests_per_second
        } else {
            self.requests_per_second
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_max_elapsed(&self) -> Duration {
        Duration::from_secs(self.retry_max_elapsed_secs)
    }
}

impl GraphConfig {
    /// Limits applied to a fresh session
    pub fn default_limits(&self) -> GraphLimits {
        GraphLimits::new(self.default_refs, self.default_cites)
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8501)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scholar: ScholarConfig::default(),
            graph: GraphConfig::default(),
            cache: CacheConfig::default(),
            session: SessionConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8501);
        assert_eq!(config.scholar.base_url, "https://api.semanticscholar.org/graph/v1");
        assert_eq!(config.graph.default_limits(), GraphLimits::new(5, 5));
        assert_eq!(config.graph.max_limit, 20);
        assert_eq!(config.session.cookie_name, "rabbithole_session");
    }

    #[test]
    fn test_request_budget_follows_key_mode() {
        let scholar = ScholarConfig::default();
        assert_eq!(scholar.requests_per_second(false), 1);
        assert_eq!(scholar.requests_per_second(true), 10);
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let scholar = ScholarConfig {
            api_key: Some("   ".to_string()),
            ..ScholarConfig::default()
        };
        assert_eq!(scholar.resolved_api_key(), None);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = Config::builder()
            .add_source(config::File::from_str(
                "[graph]\ndefault_refs = 7\n[server]\nport = 9000\n",
                config::FileFormat::Toml,
            ))
            .build()
            .and_then(|c| c.try_deserialize())
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.graph.default_refs, 7);
        assert_eq!(config.graph.default_cites, 5);
        assert_eq!(config.cache.max_entries, 256);
    }
}
