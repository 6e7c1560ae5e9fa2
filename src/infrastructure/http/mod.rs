use axum::{http::StatusCode, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    request_id::{MakeRequestUuid, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::session::AuthServiceClient;
use crate::presentation::middleware::edge::{edge_middleware, EdgeState};

/// Create the main application router with the edge pipeline in front of
/// every route.
pub fn create_app(state: EdgeState) -> Router {
    let middleware_stack = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ));

    Router::new()
        .route("/api/v1/health", get(health_check))
        .route("/api/v1/ready", get(readiness_check))
        .fallback(not_found_handler)
        .layer(axum::middleware::from_fn_with_state(state, edge_middleware))
        .layer(middleware_stack)
}

/// Health check endpoint for liveness probes
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "forum-edge-service"
    }))
}

/// Readiness check endpoint
pub async fn readiness_check() -> Json<Value> {
    Json(json!({
        "status": "ready",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Handler for 404 not found
async fn not_found_handler() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": "The requested resource was not found"
        })),
    )
}

/// Start the HTTP server
///
/// # Errors
/// Returns an error if the auth client cannot be built or the server fails to start
pub async fn start_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let session = Arc::new(AuthServiceClient::new(config.auth.clone())?);
    let state = EdgeState::new(session, config.edge_config());
    let app = create_app(state);
    let addr = config.server.socket_addr();

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
