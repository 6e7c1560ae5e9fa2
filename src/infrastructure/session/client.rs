use async_trait::async_trait;
use reqwest::{header, Client as HttpClient, StatusCode};
use std::time::Duration;
use tracing::debug;

use super::{SessionError, SessionRefresh, SessionService};
use crate::infrastructure::config::AuthServiceConfig;

/// HTTP client for the external auth session service.
///
/// A single best-effort call per request: the edge latency budget leaves no
/// room for retries, so transient failures surface as [`SessionError`] and the
/// caller degrades to an unauthenticated pass.
#[derive(Clone)]
pub struct AuthServiceClient {
    config: AuthServiceConfig,
    http_client: HttpClient,
}

impl AuthServiceClient {
    pub fn new(config: AuthServiceConfig) -> Result<Self, SessionError> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self { config, http_client })
    }

    fn refresh_url(&self) -> String {
        format!("{}{}", self.config.base_url, self.config.refresh_path)
    }
}

#[async_trait]
impl SessionService for AuthServiceClient {
    async fn refresh(&self, cookie_header: Option<&str>) -> Result<SessionRefresh, SessionError> {
        let mut request = self.http_client.post(self.refresh_url());
        if let Some(cookies) = cookie_header {
            request = request.header(header::COOKIE, cookies);
        }

        let response = request.send().await?;
        let status = response.status();

        // 401 is a valid outcome: no live session to refresh
        if status.is_server_error() {
            return Err(SessionError::UnexpectedStatus { status: status.as_u16() });
        }

        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(String::from)
            .collect::<Vec<_>>();

        let authenticated = status == StatusCode::OK;
        debug!(authenticated, cookies = set_cookies.len(), "session refresh completed");

        Ok(SessionRefresh { set_cookies, authenticated })
    }
}
