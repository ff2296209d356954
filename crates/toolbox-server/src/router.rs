use axum::{
    routing::{any, get},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::app_state::AppState;
use crate::handlers;

/// Create the main application router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        // JSON-RPC; the handler answers non-POST verbs itself
        .route("/mcp", any(handlers::mcp))
        // Plain REST routes
        .route("/hello", get(handlers::hello))
        .route("/api", any(handlers::api))
        .route("/request", any(handlers::outbound_request))
        .route("/kv", any(handlers::kv))
        .route("/d1", get(handlers::d1))
        .route("/r2", get(handlers::r2).post(handlers::r2))
        .route("/counter", get(handlers::counter))
        .route("/counter/incr", any(handlers::counter_incr))
        // OpenAI-compatible embeddings
        .route("/v1/{*path}", any(handlers::openai))
        .route("/openai/v1/{*path}", any(handlers::openai))
        .fallback(handlers::not_found)
        // CORS: allow any origin and answer preflights
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
