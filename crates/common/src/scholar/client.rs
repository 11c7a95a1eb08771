//! Semantic Scholar Graph API client
//!
//! - Anonymous access is throttled to roughly one request per second
//! - An API key raises the budget and is sent as `x-api-key`
//! - 429, 5xx, timeouts and connection failures are retried with
//!   exponential backoff

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoffBuilder};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::models::{PaperDetails, PaperSummary, SearchEnvelope, SearchHit};
use super::{ScholarClient, DETAIL_FIELDS, SEARCH_FIELDS};
use crate::config::ScholarConfig;
use crate::errors::{AppError, Result};
use crate::metrics;

/// Upstream caps search pages at 100 results
const MAX_SEARCH_LIMIT: usize = 100;
const INITIAL_RETRY_INTERVAL: Duration = Duration::from_millis(250);

pub struct SemanticScholarClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    limiter: DefaultDirectRateLimiter,
    timeout: Duration,
    retry_max_elapsed: Duration,
}

impl SemanticScholarClient {
    /// Create a client from configuration
    pub fn new(config: &ScholarConfig) -> Result<Self> {
        let api_key = config.resolved_api_key();
        let per_second = config.requests_per_second(api_key.is_some());
        let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            limiter: RateLimiter::direct(quota),
            timeout: config.timeout(),
            retry_max_elapsed: config.retry_max_elapsed(),
        })
    }

    /// GET a JSON document, retrying transient failures
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(INITIAL_RETRY_INTERVAL)
            .with_max_elapsed_time(Some(self.retry_max_elapsed))
            .build();

        retry_notify(
            policy,
            move || async move {
                self.fetch_once(operation, url, query).await.map_err(|e| {
                    if e.is_transient() {
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            },
            |err: AppError, wait: Duration| {
                warn!(
                    operation,
                    error = %err,
                    retry_in_ms = wait.as_millis() as u64,
                    "Semantic Scholar request failed, retrying"
                );
            },
        )
        .await
    }

    async fn fetch_once<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.limiter.until_ready().await;

        let start = Instant::now();
        let mut request = self.client.get(url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_scholar_request(operation, "error", start.elapsed().as_secs_f64());
                return Err(self.transport_error(e));
            }
        };

        let status = response.status();
        metrics::record_scholar_request(operation, status.as_str(), start.elapsed().as_secs_f64());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message: upstream_message(status, &body),
            });
        }

        // The client timeout also covers reading the body
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let parsed = serde_json::from_slice::<T>(&body).map_err(|e| AppError::Upstream {
            status: status.as_u16(),
            message: format!("unreadable response body: {e}"),
        })?;
        debug!(operation, elapsed_ms = start.elapsed().as_millis() as u64, "Semantic Scholar request complete");
        Ok(parsed)
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if is_timeout(&e) {
            AppError::UpstreamTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            AppError::HttpClient(e)
        }
    }
}

/// Timeouts surface either on the error itself or further down its source chain
fn is_timeout(e: &reqwest::Error) -> bool {
    if e.is_timeout() {
        return true;
    }

    let mut source = std::error::Error::source(e);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        if err.downcast_ref::<reqwest::Error>().is_some_and(reqwest::Error::is_timeout) {
            return true;
        }
        source = std::error::Error::source(err);
    }
    false
}

/// Prefer the `error`/`message` field upstream puts in JSON error bodies
fn upstream_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body).ok().and_then(|v| {
        v.get("error")
            .or_else(|| v.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    });

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string(),
        None => body.trim().chars().take(200).collect(),
    }
}

#[async_trait]
impl ScholarClient for SemanticScholarClient {
    async fn search_paper(&self, query: &str, limit: usize) -> Result<Vec<PaperSummary>> {
        let url = format!("{}/paper/search", self.base_url);
        let params = [
            ("query", query.to_string()),
            ("limit", limit.clamp(1, MAX_SEARCH_LIMIT).to_string()),
            ("fields", SEARCH_FIELDS.join(",")),
        ];

        let envelope: SearchEnvelope = self.fetch_json("search", &url, &params).await?;
        let hits: Vec<PaperSummary> = envelope
            .data
            .into_iter()
            .filter_map(SearchHit::into_summary)
            .collect();

        debug!(query, hits = hits.len(), "Paper search finished");
        Ok(hits)
    }

    async fn get_paper(&self, paper_id: &str) -> Result<PaperDetails> {
        let url = format!("{}/paper/{}", self.base_url, paper_id);
        let params = [("fields", DETAIL_FIELDS.join(","))];

        match self.fetch_json::<PaperDetails>("get_paper", &url, &params).await {
            Err(AppError::Upstream { status: 404, .. }) => Err(AppError::PaperNotFound {
                id: paper_id.to_string(),
            }),
            other => other,
        }
    }

    fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}
