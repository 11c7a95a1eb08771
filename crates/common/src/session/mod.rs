//! Per-browser UI state
//!
//! The search query lives in two slots. `search_query` is bound to the
//! rendered text input; `pending_query` holds a value staged by a node click,
//! a form submission or a reset. A staged value is moved into the active slot
//! at the start of the next render pass, before the input is bound again.
//! While the input is bound the active slot rejects direct writes.

mod store;

pub use store::SessionStore;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::graph::GraphLimits;

/// Where the user is in the search flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPhase {
    Empty,
    Set,
    Confirmed,
}

/// What a render pass sees once pending input has been applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderSnapshot {
    pub query: String,
    pub phase: QueryPhase,
    pub limits: GraphLimits,
    pub render_seq: u64,
    /// Key entered in this browser, if any
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    search_query: String,
    pending_query: Option<String>,
    confirmations: HashSet<String>,
    limits: GraphLimits,
    api_key: Option<String>,
    input_bound: bool,
    render_seq: u64,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    pub fn new(limits: GraphLimits) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            search_query: String::new(),
            pending_query: None,
            confirmations: HashSet::new(),
            limits,
            api_key: None,
            input_bound: false,
            render_seq: 0,
            created_at: now,
            last_active_at: now,
        }
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn pending_query(&self) -> Option<&str> {
        self.pending_query.as_deref()
    }

    pub fn limits(&self) -> GraphLimits {
        self.limits
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn is_input_bound(&self) -> bool {
        self.input_bound
    }

    pub fn phase(&self) -> QueryPhase {
        if self.search_query.is_empty() {
            QueryPhase::Empty
        } else if self.confirmations.contains(&self.search_query) {
            QueryPhase::Confirmed
        } else {
            QueryPhase::Set
        }
    }

    /// Start a render pass: apply any staged query, then bind the input.
    pub fn begin_render(&mut self) -> RenderSnapshot {
        // A pass that was never closed (e.g. an aborted request) must not
        // keep the slot locked forever.
        self.input_bound = false;

        if let Some(staged) = self.pending_query.take() {
            if let Err(e) = self.write_query(staged) {
                tracing::error!(error = %e, session_id = %self.id, "Failed to apply staged query");
            }
        }

        self.input_bound = true;
        self.render_seq += 1;
        self.touch();

        RenderSnapshot {
            query: self.search_query.clone(),
            phase: self.phase(),
            limits: self.limits,
            render_seq: self.render_seq,
            api_key: self.api_key.clone(),
        }
    }

    /// Finish a render pass and release the input.
    pub fn end_render(&mut self) {
        self.input_bound = false;
    }

    /// Write the active slot directly. Rejected while the input is bound.
    pub fn write_query(&mut self, value: impl Into<String>) -> Result<()> {
        if self.input_bound {
            return Err(AppError::QueryLocked);
        }
        self.search_query = value.into().trim().to_string();
        Ok(())
    }

    /// Stage a query for the next render pass. Always allowed.
    pub fn stage_query(&mut self, value: impl Into<String>) {
        self.pending_query = Some(value.into());
        self.touch();
    }

    /// Record the user's answer to "is this the paper?" for `query`
    pub fn confirm(&mut self, query: &str, confirmed: bool) {
        let query = query.trim();
        if confirmed {
            self.confirmations.insert(query.to_string());
        } else {
            self.confirmations.remove(query);
        }
        self.touch();
    }

    pub fn is_confirmed(&self, query: &str) -> bool {
        self.confirmations.contains(query.trim())
    }

    pub fn set_limits(&mut self, limits: GraphLimits) {
        self.limits = limits;
        self.touch();
    }

    /// Use `key` for this browser's upstream calls; blank falls back to the shared client
    pub fn set_api_key(&mut self, key: Option<&str>) {
        self.api_key = key.map(str::trim).filter(|k| !k.is_empty()).map(str::to_string);
        self.touch();
    }

    /// Clear the query and confirmations; the empty query lands on the next pass.
    pub fn reset(&mut self) {
        self.stage_query(String::new());
        self.confirmations.clear();
    }

    fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }
}

/// Serializable view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub search_query: String,
    pub pending_query: Option<String>,
    pub phase: QueryPhase,
    pub limits: GraphLimits,
    pub keyed: bool,
    pub input_bound: bool,
    pub render_seq: u64,
    pub created_at: String,
    pub last_active_at: String,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id,
            search_query: session.search_query.clone(),
            pending_query: session.pending_query.clone(),
            phase: session.phase(),
            limits: session.limits,
            keyed: session.api_key.is_some(),
            input_bound: session.input_bound,
            render_seq: session.render_seq,
            created_at: session.created_at.to_rfc3339(),
            last_active_at: session.last_active_at.to_rfc3339(),
        }
    }
}
