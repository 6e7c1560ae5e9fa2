#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(warnings)]
// Allow some overly strict pedantic lints for middleware code
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

//! Forum Edge Service
//!
//! The request-edge gate for a social-forum web application: per-client rate
//! limiting, session cookie refresh against the external auth service, and
//! security header synthesis with a per-request CSP nonce. Domain data (feed,
//! posts, comments, messaging, presence) lives behind the external
//! database/realtime service and is not handled here.

pub mod infrastructure;
pub mod presentation;

// Re-export commonly used types
pub use presentation::middleware::{EdgeConfig, EdgeState, SlidingWindowLimiter};
