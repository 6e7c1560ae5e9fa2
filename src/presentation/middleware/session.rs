use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::Response,
};
use tracing::{debug, warn};

use crate::infrastructure::session::{SessionRefresh, SessionService};

/// Authentication state derived from the session refresh, made available to
/// downstream handlers as a request extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthContext {
    pub authenticated: bool,
}

/// Exchange the request's cookies with the auth collaborator, best effort.
///
/// Any failure (timeout, transport, server error) is swallowed: the pipeline
/// continues with an unrefreshed session rather than failing the request.
pub async fn refresh_session(
    service: &dyn SessionService,
    headers: &HeaderMap,
) -> Option<SessionRefresh> {
    let cookie_header = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());

    match service.refresh(cookie_header).await {
        Ok(refresh) => Some(refresh),
        Err(e) => {
            warn!(error = %e, "session refresh failed, continuing unauthenticated");
            None
        }
    }
}

/// Append refreshed session cookies to the outgoing response.
///
/// Appends rather than inserts so cookies already set by a handler survive.
/// A cookie value that cannot form a header is skipped, not fatal: the
/// session-refresh middleware is the authoritative cookie writer elsewhere in
/// the request lifecycle.
pub fn attach_session_cookies(response: &mut Response, refresh: &SessionRefresh) {
    for cookie in &refresh.set_cookies {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(_) => {
                debug!("skipping malformed session cookie");
            }
        }
    }
}
