//! In-memory session storage with idle expiry

use chrono::{Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Session, SessionView};
use crate::errors::{AppError, Result};
use crate::graph::GraphLimits;

pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    ttl: Duration,
    default_limits: GraphLimits,
}

impl SessionStore {
    pub fn new(ttl_minutes: i64, default_limits: GraphLimits) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::minutes(ttl_minutes.max(1)),
            default_limits,
        }
    }

    /// Return a live session id, creating a session when `id` is unknown or expired.
    ///
    /// The flag is true when a new session was created.
    pub async fn resolve(&self, id: Option<Uuid>) -> (Uuid, bool) {
        let mut sessions = self.sessions.write().await;
        self.sweep(&mut sessions);

        if let Some(id) = id.filter(|id| sessions.contains_key(id)) {
            return (id, false);
        }

        let session = Session::new(self.default_limits);
        let id = session.id;
        sessions.insert(id, session);
        info!(session_id = %id, "Session created");
        (id, true)
    }

    /// Run `f` against a live session
    pub async fn with_session<R>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> R) -> Result<R> {
        let mut sessions = self.sessions.write().await;
        self.sweep(&mut sessions);

        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::SessionNotFound { id: id.to_string() })?;
        Ok(f(session))
    }

    pub async fn view(&self, id: Uuid) -> Result<SessionView> {
        self.with_session(id, |session| SessionView::from(&*session)).await
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    fn sweep(&self, sessions: &mut HashMap<Uuid, Session>) {
        let cutoff = Utc::now() - self.ttl;
        let before = sessions.len();
        sessions.retain(|_, session| session.last_active_at > cutoff);

        let expired = before - sessions.len();
        if expired > 0 {
            debug!(expired, "Expired sessions swept");
        }
    }
}
