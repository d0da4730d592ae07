//! Router construction with middleware

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::api::handlers::{self, AppState};
use crate::config::{CorsConfig, ServerConfig};

/// CORS policy for the configured frontend origins
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    // A literal "*" cannot be combined with credentials, so echo the origin instead
    if config.allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(AllowOrigin::mirror_request());
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Skipping invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins))
}

/// Build the full application router
pub fn build_router(state: AppState, server: &ServerConfig, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/chat", post(handlers::chat))
        .route("/clear", post(handlers::clear))
        // Enforced inside the extractors so oversized uploads still get a JSON error
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors)),
        )
        .with_state(state)
}
