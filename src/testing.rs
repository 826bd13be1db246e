//! Drives the full router against in-memory storage.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    app::build_app,
    cache::UserCache,
    config::AppConfig,
    mailer::fake::FakeMailer,
    state::AppState,
    store::memory::MemoryStore,
};

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<FakeMailer>,
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppState::test_config())
    }

    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        Self::build(AppState::test_config(), store, None, Arc::new(FakeMailer::default()))
    }

    pub fn with_mailer(mailer: Arc<FakeMailer>) -> Self {
        Self::build(
            AppState::test_config(),
            Arc::new(MemoryStore::new()),
            None,
            mailer,
        )
    }

    pub fn with_cache(cache: Arc<dyn UserCache>) -> Self {
        Self::build(
            AppState::test_config(),
            Arc::new(MemoryStore::new()),
            Some(cache),
            Arc::new(FakeMailer::default()),
        )
    }

    /// Starts from [`AppState::test_config`] with whatever the caller changed.
    pub fn with_config(config: AppConfig) -> Self {
        Self::build(
            config,
            Arc::new(MemoryStore::new()),
            None,
            Arc::new(FakeMailer::default()),
        )
    }

    fn build(
        config: AppConfig,
        store: Arc<MemoryStore>,
        cache: Option<Arc<dyn UserCache>>,
        mailer: Arc<FakeMailer>,
    ) -> Self {
        let state = AppState::from_parts(
            Arc::new(config),
            store.storage(),
            cache,
            mailer.clone(),
        );
        Self {
            router: build_app(state.clone()),
            store,
            mailer,
            state,
        }
    }

    pub fn token_for(&self, user_id: i64) -> String {
        self.state.jwt.sign(user_id).expect("sign test token")
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, token, Some(body)).await
    }

    /// Sends one request and returns the status and the JSON body
    /// (`Value::Null` when the body is empty).
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .expect("build request");
        self.dispatch(req).await
    }

    /// Like [`send`](Self::send) with a raw `Authorization` header and no body.
    pub async fn send_with_auth(
        &self,
        method: &str,
        uri: &str,
        authorization: &str,
    ) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, authorization)
            .body(Body::empty())
            .expect("build request");
        self.dispatch(req).await
    }

    /// Sends a bare request and hands back the whole response, headers included.
    pub async fn raw(&self, method: &str, uri: &str) -> Response {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("build request");
        self.router.clone().oneshot(req).await.expect("infallible")
    }

    async fn dispatch(&self, req: Request<Body>) -> (StatusCode, Value) {
        let res = self.router.clone().oneshot(req).await.expect("infallible");
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }
}
