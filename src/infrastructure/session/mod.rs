//! Session exchange with the external auth collaborator.
//!
//! The edge never stores identity itself: it forwards the inbound session
//! cookies to the auth service and carries refreshed cookies back onto the
//! response. Failures here are recoverable; the pipeline continues
//! unauthenticated.

pub mod client;

pub use client::AuthServiceClient;

use async_trait::async_trait;
use thiserror::Error;

/// Result of a session refresh round trip
#[derive(Debug, Clone, Default)]
pub struct SessionRefresh {
    /// `Set-Cookie` values to carry onto the outgoing response
    pub set_cookies: Vec<String>,
    /// Whether the auth service recognized a live session
    pub authenticated: bool,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("auth service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("auth service returned unexpected status {status}")]
    UnexpectedStatus { status: u16 },
}

/// Contract with the auth session service: read the request's cookies, refresh
/// them against the identity provider, hand back cookies for the response.
#[async_trait]
pub trait SessionService: Send + Sync {
    async fn refresh(&self, cookie_header: Option<&str>) -> Result<SessionRefresh, SessionError>;
}
