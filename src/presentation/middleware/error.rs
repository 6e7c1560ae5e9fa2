use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Errors the edge pipeline can produce.
///
/// Session-refresh failures never appear here: they are recovered in place and
/// the request continues unauthenticated.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Rate limit exceeded: {message}")]
    RateLimit { message: String },

    #[error("External service error: {service}: {message}")]
    ExternalService { service: String, message: String },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error type label for logging
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::RateLimit { .. } => "rate_limit",
            AppError::ExternalService { .. } => "external_service",
            AppError::BadRequest { .. } => "bad_request",
            AppError::Internal { .. } => "internal",
        }
    }

    /// Expected client-facing conditions are warnings; everything else is an error
    pub fn should_log_as_error(&self) -> bool {
        matches!(self, AppError::ExternalService { .. } | AppError::Internal { .. })
    }

    fn to_body(&self, error_id: &str) -> Value {
        json!({
            "error": {
                "id": error_id,
                "type": self.error_type(),
                "message": self.to_string(),
                "timestamp": Utc::now().to_rfc3339(),
            }
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = Uuid::new_v4().to_string();

        if self.should_log_as_error() {
            error!(error_type = self.error_type(), error_id, "Application error: {}", self);
        } else {
            warn!(error_type = self.error_type(), error_id, "Application warning: {}", self);
        }

        (status, Json(self.to_body(&error_id))).into_response()
    }
}

/// The 429 short-circuit response. Carries only retry timing: no session
/// refresh, no security headers, no cookies.
#[derive(Debug, Clone)]
pub struct RateLimitRejection {
    pub message: String,
    pub reset_at: DateTime<Utc>,
}

impl IntoResponse for RateLimitRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Too Many Requests",
                "message": self.message,
                "resetAt": self.reset_at.to_rfc3339(),
            })),
        )
            .into_response()
    }
}
