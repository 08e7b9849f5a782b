#![allow(dead_code)]

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;
use wisdom_service::config::WisdomSettings;
use wisdom_service::models::Match;
use wisdom_service::services::providers::mock::{
    MockEmbeddingProvider, MockTextProvider, MockVectorIndex,
};
use wisdom_service::services::WisdomService;
use wisdom_service::startup::{build_router, AppState};

pub const NAMESPACE: &str = "buffett-wisdom-namespace";

pub fn settings() -> WisdomSettings {
    WisdomSettings {
        author: "Warren Buffett".to_string(),
        answer_top_k: 4,
        condense_quotes: true,
        ..WisdomSettings::default()
    }
}

pub fn state_with(index: Arc<MockVectorIndex>, generator: Arc<MockTextProvider>) -> AppState {
    AppState {
        wisdom: WisdomService::new(
            Arc::new(MockEmbeddingProvider::new(true)),
            index,
            generator,
            settings(),
            NAMESPACE.to_string(),
        ),
    }
}

pub fn router_with(index: MockVectorIndex, generator: MockTextProvider) -> Router {
    build_router(state_with(Arc::new(index), Arc::new(generator)))
}

pub fn passages(texts: &[&str]) -> Vec<Match> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| Match::with_text(format!("p{}", i + 1), *t))
        .collect()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

pub async fn send(router: Router, method: Method, uri: &str, body: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec();

    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn post_json(router: Router, uri: &str, body: &str) -> TestResponse {
    send(router, Method::POST, uri, Some(body)).await
}

pub fn assert_cors(headers: &HeaderMap) {
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
}
