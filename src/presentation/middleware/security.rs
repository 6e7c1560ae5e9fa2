use axum::http::{header, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;

/// Response header exposing the per-request nonce to downstream renderers
pub const NONCE_HEADER: &str = "x-nonce";

/// Security header configuration, fixed at startup
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Relaxes script-src for local tooling; must be false in production
    pub development_mode: bool,
    /// External media storage origin admitted into img/connect/media sources
    pub storage_origin: Option<String>,
    /// Origin allowed by the CORS headers on API responses
    pub allowed_origin: String,
    /// HSTS max age in seconds
    pub hsts_max_age: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            development_mode: false,
            storage_origin: None,
            allowed_origin: "https://forum.example.com".to_string(),
            hsts_max_age: 31_536_000, // 1 year
        }
    }
}

/// A per-request CSP nonce.
///
/// Generated fresh from the thread-local CSPRNG for every request; reusing a
/// nonce across requests or leaking it outside response headers defeats the
/// inline-script allowlisting it exists for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CspNonce(String);

impl CspNonce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(BASE64.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Compose the Content-Security-Policy string with the nonce embedded in
/// script-src. Development mode additionally permits eval for local tooling.
pub fn build_csp(nonce: &CspNonce, config: &SecurityConfig) -> String {
    let storage = config.storage_origin.as_deref().unwrap_or("");

    let script_src = if config.development_mode {
        format!("script-src 'self' 'nonce-{}' 'unsafe-eval'", nonce.as_str())
    } else {
        format!("script-src 'self' 'nonce-{}'", nonce.as_str())
    };

    let directives = [
        "default-src 'self'".to_string(),
        script_src,
        "style-src 'self' 'unsafe-inline'".to_string(),
        format!("img-src 'self' data: blob: {storage}").trim_end().to_string(),
        "font-src 'self' data:".to_string(),
        format!("connect-src 'self' {storage}").trim_end().to_string(),
        format!("media-src 'self' {storage}").trim_end().to_string(),
        "object-src 'none'".to_string(),
        "frame-ancestors 'none'".to_string(),
        "base-uri 'self'".to_string(),
        "form-action 'self'".to_string(),
    ];

    directives.join("; ")
}

/// Attach the full defense-in-depth header set for HTML page responses.
///
/// Deterministic given configuration. A configured value that cannot form a
/// valid header is an error: serving HTML without its CSP is a security
/// regression, not a degraded experience.
pub fn apply_page_security_headers(
    headers: &mut HeaderMap,
    csp: &str,
    nonce: &CspNonce,
    config: &SecurityConfig,
) -> Result<(), header::InvalidHeaderValue> {
    headers.insert(header::CONTENT_SECURITY_POLICY, HeaderValue::from_str(csp)?);
    headers.insert(NONCE_HEADER, HeaderValue::from_str(nonce.as_str())?);

    let hsts = format!("max-age={}; includeSubDomains", config.hsts_max_age);
    headers.insert(header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_str(&hsts)?);

    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-xss-protection", HeaderValue::from_static("1; mode=block"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "permissions-policy",
        HeaderValue::from_static(
            "accelerometer=(), camera=(), geolocation=(), gyroscope=(), magnetometer=(), microphone=(), payment=(), usb=()",
        ),
    );

    // Storage origin must stay loadable, so embedder policy is credentialless
    // rather than require-corp; embedding of this app itself stays blocked.
    headers.insert("cross-origin-opener-policy", HeaderValue::from_static("same-origin"));
    headers.insert("cross-origin-resource-policy", HeaderValue::from_static("same-site"));
    headers.insert("cross-origin-embedder-policy", HeaderValue::from_static("credentialless"));

    Ok(())
}

/// Attach the narrower header set for machine-consumed (API) responses: no CSP
/// (not meaningful for non-HTML bodies), but still anti-sniffing and
/// anti-framing, plus CORS scoped to the configured origin.
pub fn apply_api_security_headers(
    headers: &mut HeaderMap,
    config: &SecurityConfig,
) -> Result<(), header::InvalidHeaderValue> {
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));

    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_str(&config.allowed_origin)?,
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("authorization, content-type, accept"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));

    Ok(())
}
