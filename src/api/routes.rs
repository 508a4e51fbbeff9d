//! API route configuration

use axum::{
    http::HeaderValue,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::ServerConfig;

use super::handlers::{self, AppState};

/// Build the complete API router with middleware
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(handlers::metrics))
        .route("/api/sustain", get(handlers::status).post(handlers::sustain))
        .route("/api/sustain/co2-savings", get(handlers::co2_savings))
        .layer(RequestBodyLimitLayer::new(server.max_body_size_kb * 1024))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&server.allowed_origins)),
        )
        .with_state(state)
}

/// Any origin when the list is empty, otherwise exactly the listed origins
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "SUSTAIN",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
