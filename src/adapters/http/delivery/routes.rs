//! Axum router configuration for delivery endpoints.

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{download, health, DeliveryAppState};

/// Create the delivery router.
///
/// # Routes
/// - `GET /downloads/:token` - Redeem a download token
/// - `GET /health` - Liveness
pub fn delivery_router(state: DeliveryAppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/downloads/:token", get(download))
        .route("/health", get(health))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
