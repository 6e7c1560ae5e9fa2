//! Middleware for the request edge
//!
//! Every route runs behind a single pipeline: rate limiting, session cookie
//! refresh against the external auth service, then security header synthesis
//! (including a per-request CSP nonce).

pub mod edge;
pub mod error;
pub mod rate_limit;
pub mod security;
pub mod session;

// Re-export commonly used types
pub use edge::{edge_middleware, EdgeConfig, EdgeState};
pub use error::{AppError, RateLimitRejection};
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimitTier, SlidingWindowLimiter};
pub use security::{CspNonce, SecurityConfig, NONCE_HEADER};
pub use session::AuthContext;
