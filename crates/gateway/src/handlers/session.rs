//! Session form endpoints
//!
//! Every form answers `303 See Other` back to `/`. Query changes are staged
//! and only reach the bound input on the next page render.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::validated;
use crate::AppState;
use rabbithole_common::{errors::Result, graph::GraphLimits};

/// Look up the caller's session from its cookie, creating one when needed.
///
/// The returned jar carries a fresh cookie when a session was created.
pub(crate) async fn resolve_session(state: &AppState, jar: CookieJar) -> (Uuid, CookieJar) {
    let cookie_name = state.config.session.cookie_name.clone();
    let current = jar
        .get(&cookie_name)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok());

    let (id, created) = state.sessions.resolve(current).await;
    if !created {
        return (id, jar);
    }

    let cookie = Cookie::build((cookie_name, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (id, jar.add(cookie))
}

/// Longest query accepted from a form, matching `/api/search`
const MAX_QUERY_CHARS: u64 = 500;

#[derive(Debug, Deserialize, Validate)]
pub struct QueryForm {
    #[serde(default)]
    #[validate(length(max = MAX_QUERY_CHARS))]
    pub query: String,
}

/// Submit the search box
pub async fn submit_query(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<QueryForm>,
) -> Result<impl IntoResponse> {
    let form = validated(form)?;
    let (session_id, jar) = resolve_session(&state, jar).await;
    debug!(%session_id, query = %form.query, "Query submitted");

    state
        .sessions
        .with_session(session_id, |session| session.stage_query(form.query))
        .await?;

    Ok((jar, Redirect::to("/")))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SelectForm {
    #[serde(default)]
    pub paper_id: Option<String>,
    #[validate(length(min = 1, max = MAX_QUERY_CHARS))]
    pub title: String,
}

/// A graph node was clicked: its title becomes the next seed query
pub async fn select_node(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SelectForm>,
) -> Result<impl IntoResponse> {
    let form = validated(form)?;
    let (session_id, jar) = resolve_session(&state, jar).await;
    info!(
        %session_id,
        paper_id = form.paper_id.as_deref().unwrap_or_default(),
        query = %form.title,
        "Node selected as next seed"
    );

    state
        .sessions
        .with_session(session_id, |session| session.stage_query(form.title))
        .await?;

    Ok((jar, Redirect::to("/")))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmForm {
    #[validate(length(max = MAX_QUERY_CHARS))]
    pub query: String,
    /// Present only when the checkbox is ticked
    #[serde(default)]
    pub confirmed: Option<String>,
}

/// Answer "is this the paper?" for the query that produced the candidate
pub async fn confirm(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ConfirmForm>,
) -> Result<impl IntoResponse> {
    let form = validated(form)?;
    let (session_id, jar) = resolve_session(&state, jar).await;
    let confirmed = form.confirmed.is_some();
    debug!(%session_id, query = %form.query, confirmed, "Candidate confirmation changed");

    state
        .sessions
        .with_session(session_id, |session| session.confirm(&form.query, confirmed))
        .await?;

    Ok((jar, Redirect::to("/")))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LimitsForm {
    #[validate(range(min = 1, max = 20))]
    pub max_refs: usize,
    #[validate(range(min = 1, max = 20))]
    pub max_cites: usize,
}

/// Move the sidebar sliders
pub async fn set_limits(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LimitsForm>,
) -> Result<impl IntoResponse> {
    let form = validated(form)?;
    let limits =
        GraphLimits::new(form.max_refs, form.max_cites).clamped(state.config.graph.max_limit);

    let (session_id, jar) = resolve_session(&state, jar).await;
    state
        .sessions
        .with_session(session_id, |session| session.set_limits(limits))
        .await?;

    Ok((jar, Redirect::to("/")))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApiKeyForm {
    /// Blank clears the key
    #[serde(default)]
    #[validate(length(max = 200), custom(function = "printable_ascii"))]
    pub api_key: String,
}

fn printable_ascii(value: &str) -> std::result::Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
        Ok(())
    } else {
        Err(ValidationError::new("printable_ascii"))
    }
}

/// Store or clear the Semantic Scholar key used for this browser
pub async fn set_api_key(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ApiKeyForm>,
) -> Result<impl IntoResponse> {
    let form = validated(form)?;
    let (session_id, jar) = resolve_session(&state, jar).await;

    let keyed = state
        .sessions
        .with_session(session_id, |session| {
            session.set_api_key(Some(&form.api_key));
            session.api_key().is_some()
        })
        .await?;
    info!(%session_id, keyed, "Session API key updated");

    Ok((jar, Redirect::to("/")))
}

/// Clear the query and every confirmation
pub async fn reset(State(state): State<AppState>, jar: CookieJar) -> Result<impl IntoResponse> {
    let (session_id, jar) = resolve_session(&state, jar).await;
    info!(%session_id, "Session reset");

    state
        .sessions
        .with_session(session_id, |session| session.reset())
        .await?;

    Ok((jar, Redirect::to("/")))
}
