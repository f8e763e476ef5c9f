//! Router configuration for the web server.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
///
/// The browser client calls `/api/...`; scripts and older clients call the
/// bare paths. Both map to the same handlers.
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/test-text", get(handlers::test_text))
        .route("/ocr", post(handlers::ocr))
        .route("/simplify", post(handlers::simplify))
        .route("/explain", post(handlers::explain))
        .route("/knowledge-tree", post(handlers::knowledge_tree));

    Router::new()
        .nest("/api", api.clone())
        .merge(api)
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
