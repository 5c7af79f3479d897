use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{response::Response, Request},
    Router,
};
use dashboard::{
    routes::{router, AppState, SharedState},
    upstream::Upstream,
};
use tower::ServiceExt as _;

pub async fn axum_body_to_str(body: Body) -> String {
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn oneshot_request(router: Router, request: Request<Body>) -> Response<Body> {
    router.oneshot(request).await.unwrap()
}

/// A dashboard whose refresh points at `upstream_url`.
pub fn setup_with_timeout(upstream_url: &str, timeout: Duration) -> (Router, SharedState) {
    let upstream = Upstream::build(upstream_url, timeout).unwrap();
    let state = Arc::new(AppState::new(upstream));
    (router(Arc::clone(&state)), state)
}

pub fn setup(upstream_url: &str) -> (Router, SharedState) {
    setup_with_timeout(upstream_url, Duration::from_secs(5))
}

/// Serves `app` on an ephemeral local port and returns the url of its `/experiments` route.
pub async fn spawn_upstream(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{address}/experiments")
}

/// A url that nothing is listening on.
pub async fn closed_upstream() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{address}/experiments")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/experiments")
        .header("Content-Type", "application/json")
        .body(body.into())
        .unwrap()
}
