//! Route table and middleware stack

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::handlers::{api, health, page, session};
use crate::middleware::{metrics::track_requests, rate_limit::rate_limit_middleware};
use crate::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        // Page and session forms
        .route("/", get(page::index))
        .route("/session/query", post(session::submit_query))
        .route("/session/select", post(session::select_node))
        .route("/session/confirm", post(session::confirm))
        .route("/session/limits", post(session::set_limits))
        .route("/session/reset", post(session::reset))
        .route("/session/api_key", post(session::set_api_key))

        // JSON API
        .route("/api/search", get(api::search))
        .route("/api/papers/{paper_id}/graph", get(api::paper_graph))
        .route("/api/session", get(api::current_session))

        // Operational endpoints
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/metrics", get(health::metrics))
        .route_layer(from_fn(track_requests));

    let request_timeout = state.config.request_timeout();
    if let Some(limiter) = state.limiter.clone() {
        router = router.layer(from_fn_with_state(limiter, rate_limit_middleware));
    }

    // Request ID is set before it is propagated onto the response
    router
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::rate_limit::InboundLimiter;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use rabbithole_common::{config::AppConfig, scholar::StaticScholar, ScholarClient};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state_with(scholar: Arc<StaticScholar>) -> AppState {
        AppState::new(AppConfig::default(), scholar as Arc<dyn ScholarClient>).unwrap()
    }

    fn sample_state() -> (AppState, Arc<StaticScholar>) {
        let scholar = Arc::new(StaticScholar::sample());
        (state_with(scholar.clone()), scholar)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn get_page(cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, cookie: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::COOKIE, cookie)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// `name=value` of the session cookie set on a response
    fn session_cookie(response: &Response) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    /// Open a session and stage `query` on it
    async fn session_with_query(app: &Router, query: &str) -> String {
        let response = send(app, get_page(None)).await;
        let cookie = session_cookie(&response);

        let response = send(app, post_form("/session/query", &cookie, &format!("query={query}"))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        cookie
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = sample_state();
        let app = create_router(state);

        let response = send(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(body_text(response).await.contains("healthy"));
    }

    #[tokio::test]
    async fn test_first_visit_sets_cookie_and_renders_empty_page() {
        let (state, scholar) = sample_state();
        let app = create_router(state);

        let response = send(&app, get_page(None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(session_cookie(&response).starts_with("rabbithole_session="));
        let html = body_text(response).await;
        assert!(html.contains("Enter a paper title to jump in"));
        assert!(html.contains("Free Mode Active"));
        assert!(!html.contains("Is this the paper?"));
        assert_eq!(scholar.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_query_shows_candidate() {
        let (state, _) = sample_state();
        let app = create_router(state);
        let cookie = session_with_query(&app, "attention").await;

        let html = body_text(send(&app, get_page(Some(&cookie))).await).await;

        assert!(html.contains("Is this the paper?"));
        assert!(html.contains("Attention Is All You Need"));
        assert!(html.contains("(2017)"));
        assert!(html.contains("The dominant sequence transduction models"));
        assert!(!html.contains("Graph generated"));
        assert!(html.contains("Why this matters"));
    }

    #[tokio::test]
    async fn test_confirm_builds_graph_once() {
        let (state, scholar) = sample_state();
        let app = create_router(state);
        let cookie = session_with_query(&app, "attention").await;
        send(&app, get_page(Some(&cookie))).await;

        let response = send(&app, post_form("/session/confirm", &cookie, "query=attention&confirmed=true")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let html = body_text(send(&app, get_page(Some(&cookie))).await).await;
        assert!(html.contains("Graph generated: 6 Papers found."));
        assert!(html.contains("#FF4B4B"));

        // A second render reuses the memoized graph
        send(&app, get_page(Some(&cookie))).await;
        assert_eq!(scholar.detail_calls(), 1);
    }

    #[tokio::test]
    async fn test_unchecking_confirmation_hides_graph() {
        let (state, _) = sample_state();
        let app = create_router(state);
        let cookie = session_with_query(&app, "attention").await;
        send(&app, post_form("/session/confirm", &cookie, "query=attention&confirmed=true")).await;
        send(&app, post_form("/session/confirm", &cookie, "query=attention")).await;

        let html = body_text(send(&app, get_page(Some(&cookie))).await).await;
        assert!(html.contains("Is this the paper?"));
        assert!(!html.contains("Graph generated"));
    }

    #[tokio::test]
    async fn test_node_selection_is_staged_until_next_render() {
        let (state, _) = sample_state();
        let app = create_router(state);
        let cookie = session_with_query(&app, "attention").await;
        send(&app, get_page(Some(&cookie))).await;

        let response = send(
            &app,
            post_form(
                "/session/select",
                &cookie,
                "paper_id=df2b0e26d0599ce3e70df8a9da02e51594e0e992&title=BERT",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");

        let session = body_text(
            send(
                &app,
                Request::builder()
                    .uri("/api/session")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await,
        )
        .await;
        let session: serde_json::Value = serde_json::from_str(&session).unwrap();
        assert_eq!(session["search_query"], "attention");
        assert_eq!(session["pending_query"], "BERT");
        assert_eq!(session["input_bound"], false);

        let html = body_text(send(&app, get_page(Some(&cookie))).await).await;
        assert!(html.contains("value=\"BERT\""));
        assert!(html.contains("BERT: Pre-training"));
    }

    #[tokio::test]
    async fn test_reset_clears_query() {
        let (state, _) = sample_state();
        let app = create_router(state);
        let cookie = session_with_query(&app, "attention").await;
        send(&app, get_page(Some(&cookie))).await;

        let response = send(&app, post_form("/session/reset", &cookie, "")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let html = body_text(send(&app, get_page(Some(&cookie))).await).await;
        assert!(!html.contains("Is this the paper?"));
        assert!(!html.contains("Why this matters"));
    }

    #[tokio::test]
    async fn test_no_results_message() {
        let (state, _) = sample_state();
        let app = create_router(state);
        let cookie = session_with_query(&app, "quantum+gravity").await;

        let html = body_text(send(&app, get_page(Some(&cookie))).await).await;
        assert!(html.contains("No papers found."));
    }

    #[tokio::test]
    async fn test_search_failure_is_rendered() {
        let (state, scholar) = sample_state();
        let app = create_router(state);
        let cookie = session_with_query(&app, "attention").await;
        scholar.set_failing(true);

        let response = send(&app, get_page(Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Search failed:"));
    }

    #[tokio::test]
    async fn test_graph_failure_is_rendered_under_candidate() {
        let (state, scholar) = sample_state();
        let app = create_router(state);
        let cookie = session_with_query(&app, "attention").await;
        send(&app, post_form("/session/confirm", &cookie, "query=attention&confirmed=true")).await;
        scholar.set_failing_details(true);

        let response = send(&app, get_page(Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Graph error:"));
        assert!(html.contains("Attention Is All You Need"));
        assert!(!html.contains("Graph generated"));
    }

    #[tokio::test]
    async fn test_session_api_key_switches_to_pro_mode() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let (state, _) = sample_state();
        let state = state.with_client_factory(Arc::new(
            move |_key: &str| -> rabbithole_common::errors::Result<Arc<dyn ScholarClient>> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(StaticScholar::sample().keyed()) as Arc<dyn ScholarClient>)
            },
        ));
        let app = create_router(state);
        let cookie = session_cookie(&send(&app, get_page(None)).await);

        let response = send(&app, post_form("/session/api_key", &cookie, "api_key=s2-secret")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let html = body_text(send(&app, get_page(Some(&cookie))).await).await;
        assert!(html.contains("Pro Mode Active"));
        assert!(html.contains("Key saved for this session"));
        assert!(!html.contains("s2-secret"));
        send(&app, get_page(Some(&cookie))).await;
        assert_eq!(built.load(Ordering::SeqCst), 1);

        // Another browser stays on the shared client
        let html = body_text(send(&app, get_page(None)).await).await;
        assert!(html.contains("Free Mode Active"));

        send(&app, post_form("/session/api_key", &cookie, "api_key=")).await;
        let response = send(
            &app,
            Request::builder()
                .uri("/api/session")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["keyed"], false);
    }

    #[tokio::test]
    async fn test_api_key_rejects_control_characters() {
        let (state, _) = sample_state();
        let app = create_router(state);
        let cookie = session_cookie(&send(&app, get_page(None)).await);

        let response = send(&app, post_form("/session/api_key", &cookie, "api_key=bad%0Akey")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_form_queries_are_length_checked() {
        let (state, _) = sample_state();
        let app = create_router(state);
        let cookie = session_cookie(&send(&app, get_page(None)).await);
        let long = "a".repeat(501);

        let response = send(&app, post_form("/session/query", &cookie, &format!("query={long}"))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, post_form("/session/select", &cookie, "paper_id=p1&title=")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, post_form("/session/query", &cookie, &format!("query={}", &long[1..]))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_limits_are_validated() {
        let (state, _) = sample_state();
        let app = create_router(state);
        let cookie = session_cookie(&send(&app, get_page(None)).await);

        let response = send(&app, post_form("/session/limits", &cookie, "max_refs=0&max_cites=5")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, post_form("/session/limits", &cookie, "max_refs=2&max_cites=1")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let html = body_text(send(&app, get_page(Some(&cookie))).await).await;
        assert!(html.contains("name=\"max_refs\" min=\"1\" max=\"20\" value=\"2\""));
    }

    #[tokio::test]
    async fn test_api_search() {
        let (state, _) = sample_state();
        let app = create_router(state);

        let response = send(&app, Request::builder().uri("/api/search?q=attention").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
        assert_eq!(body["results"][0]["paperId"], "204e3073870fae3d05bcbc2f6a8e263d9b72e776");

        let response = send(&app, Request::builder().uri("/api/search?q=").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_api_graph() {
        let (state, _) = sample_state();
        let app = create_router(state);

        let response = send(
            &app,
            Request::builder()
                .uri("/api/papers/204e3073870fae3d05bcbc2f6a8e263d9b72e776/graph?limit_refs=1&limit_cites=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["node_count"], 3);
        assert_eq!(body["edges"][0]["label"], "influenced");
        assert_eq!(body["view"]["height"], 600);

        let response = send(&app, Request::builder().uri("/api/papers/missing/graph").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(
            &app,
            Request::builder()
                .uri("/api/papers/missing/graph?limit_refs=21")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ready_reports_mode() {
        let scholar = Arc::new(StaticScholar::sample().keyed());
        let app = create_router(state_with(scholar));

        let response = send(&app, Request::builder().uri("/ready").body(Body::empty()).unwrap()).await;
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["checks"]["scholar"]["mode"], "pro");
        assert_eq!(body["checks"]["cache"]["entries"], 0);
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let (state, _) = sample_state();
        let app = create_router(state);

        let response = send(&app, Request::builder().uri("/metrics").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_inbound_rate_limit() {
        let (mut state, _) = sample_state();
        state.limiter = Some(InboundLimiter::new(1, 1));
        let app = create_router(state);

        let first = send(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
        let second = send(&app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
