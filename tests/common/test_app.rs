use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;

use forum_edge_service::infrastructure::http::create_app;
use forum_edge_service::infrastructure::session::{
    SessionError, SessionRefresh, SessionService,
};
use forum_edge_service::presentation::middleware::{EdgeConfig, EdgeState};

/// Session service double that always refreshes successfully
pub struct FixedSession {
    pub set_cookies: Vec<String>,
    pub authenticated: bool,
}

impl Default for FixedSession {
    fn default() -> Self {
        Self {
            set_cookies: vec!["forum_session=refreshed; HttpOnly; Path=/".to_string()],
            authenticated: true,
        }
    }
}

#[async_trait::async_trait]
impl SessionService for FixedSession {
    async fn refresh(
        &self,
        _cookie_header: Option<&str>,
    ) -> Result<SessionRefresh, SessionError> {
        Ok(SessionRefresh {
            set_cookies: self.set_cookies.clone(),
            authenticated: self.authenticated,
        })
    }
}

/// Session service double whose collaborator is always down
pub struct BrokenSession;

#[async_trait::async_trait]
impl SessionService for BrokenSession {
    async fn refresh(
        &self,
        _cookie_header: Option<&str>,
    ) -> Result<SessionRefresh, SessionError> {
        Err(SessionError::UnexpectedStatus { status: 503 })
    }
}

pub struct TestApp {
    pub router: Router,
}

impl TestApp {
    pub fn new(config: EdgeConfig) -> Self {
        Self::with_session(config, Arc::new(FixedSession::default()))
    }

    pub fn with_session(config: EdgeConfig, session: Arc<dyn SessionService>) -> Self {
        Self { router: create_app(EdgeState::new(session, config)) }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.get_with_headers(path, &[]).await
    }

    /// Issue a GET with extra request headers (client identity, prefetch
    /// signals, cookies)
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::builder().uri(path).method("GET");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::empty()).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        TestResponse::new(response).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    async fn new(response: axum::response::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();

        Self { status, headers, body }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}
