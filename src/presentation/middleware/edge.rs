use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use super::error::{AppError, RateLimitRejection};
use super::rate_limit::{client_identity, RateLimitDecision, RateLimitTier, SlidingWindowLimiter};
use super::security::{
    apply_api_security_headers, apply_page_security_headers, build_csp, CspNonce, SecurityConfig,
};
use super::session::{attach_session_cookies, refresh_session, AuthContext};
use crate::infrastructure::session::SessionService;

/// Image extensions served directly by the CDN/asset layer
const STATIC_EXTENSIONS: [&str; 7] = [".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".ico"];

/// Edge pipeline behavior, fixed at startup. The middleware branches only on
/// this object, never on ad-hoc environment reads.
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    /// Global rate-limiting switch
    pub rate_limiting_enabled: bool,
    /// Deployment platform already provides equivalent protection
    pub platform_managed_limits: bool,
    pub security: SecurityConfig,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            rate_limiting_enabled: true,
            platform_managed_limits: false,
            security: SecurityConfig::default(),
        }
    }
}

/// Shared pipeline state, injected via `from_fn_with_state`
#[derive(Clone)]
pub struct EdgeState {
    pub limiter: SlidingWindowLimiter,
    pub session: Arc<dyn SessionService>,
    pub config: EdgeConfig,
}

impl EdgeState {
    pub fn new(session: Arc<dyn SessionService>, config: EdgeConfig) -> Self {
        Self { limiter: SlidingWindowLimiter::new(), session, config }
    }
}

/// The request-edge gate: rate check, session refresh, header attach.
///
/// Runs in front of every route except static assets and prefetches. The rate
/// decision is computed at most once per request and reused for the telemetry
/// headers, so gate and report can never disagree.
pub async fn edge_middleware(
    State(state): State<EdgeState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if is_excluded_path(&path) || is_prefetch(request.headers()) {
        return next.run(request).await;
    }

    // RATE_CHECK
    let decision = if rate_limiting_active(&state.config, &path) {
        let client = client_identity(&request);
        let config = RateLimitTier::for_path(&path).to_config();
        let decision = state.limiter.check(&client, &config).await;

        if decision.limited {
            warn!(client = %client, path = %path, reset_at = %decision.reset_at, "rate limit exceeded");
            // REJECTED: no session refresh, no security headers, no cookies
            return RateLimitRejection {
                message: format!(
                    "Rate limit exceeded. Try again after {}",
                    decision.reset_at.to_rfc3339()
                ),
                reset_at: decision.reset_at,
            }
            .into_response();
        }
        Some(decision)
    } else {
        None
    };

    // SESSION_REFRESH: best effort, produces the base response state
    let refresh = refresh_session(state.session.as_ref(), request.headers()).await;
    let authenticated = refresh.as_ref().is_some_and(|r| r.authenticated);
    request.extensions_mut().insert(AuthContext { authenticated });

    // One nonce per request; page renderers read it from the extension, the
    // response carries it in both the CSP directive and the nonce header.
    let nonce = if is_api_path(&path) { None } else { Some(CspNonce::generate()) };
    if let Some(nonce) = &nonce {
        request.extensions_mut().insert(nonce.clone());
    }

    let mut response = next.run(request).await;

    // HEADER_ATTACH
    if let Err(e) =
        attach_security_headers(&mut response, nonce.as_ref(), decision.as_ref(), &state.config)
    {
        // Serving HTML without its CSP is a security regression, so this is
        // fatal for the request rather than a degraded pass.
        return AppError::Internal { message: format!("failed to attach security headers: {e}") }
            .into_response();
    }

    if let Some(refresh) = &refresh {
        attach_session_cookies(&mut response, refresh);
    }

    response
}

fn attach_security_headers(
    response: &mut Response,
    nonce: Option<&CspNonce>,
    decision: Option<&RateLimitDecision>,
    config: &EdgeConfig,
) -> Result<(), axum::http::header::InvalidHeaderValue> {
    let headers = response.headers_mut();

    match nonce {
        Some(nonce) => {
            let csp = build_csp(nonce, &config.security);
            apply_page_security_headers(headers, &csp, nonce, &config.security)?;
        }
        None => {
            apply_api_security_headers(headers, &config.security)?;
        }
    }

    if let Some(decision) = decision {
        decision.add_headers(headers);
    }

    Ok(())
}

/// Rate limiting is skipped in development, when globally disabled, when the
/// platform provides equivalent protection, and on internal framework paths.
fn rate_limiting_active(config: &EdgeConfig, path: &str) -> bool {
    !config.security.development_mode
        && config.rate_limiting_enabled
        && !config.platform_managed_limits
        && !is_internal_path(path)
}

/// Paths the pipeline bypasses entirely: build output, optimized images,
/// favicon, and direct image requests.
pub fn is_excluded_path(path: &str) -> bool {
    path.starts_with("/_assets/")
        || path.starts_with("/_image")
        || path == "/favicon.ico"
        || STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Internal framework paths skip the rate check but still get session refresh
/// and security headers.
fn is_internal_path(path: &str) -> bool {
    path.starts_with("/_")
}

fn is_api_path(path: &str) -> bool {
    path.starts_with("/api")
}

/// Speculative prefetches bypass the pipeline so they neither burn rate budget
/// nor trigger session refreshes.
fn is_prefetch(headers: &HeaderMap) -> bool {
    let signals = [headers.get("purpose"), headers.get("sec-purpose")];
    signals.into_iter().flatten().any(|v| {
        v.to_str().is_ok_and(|s| s.to_ascii_lowercase().contains("prefetch"))
    })
}
