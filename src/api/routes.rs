use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Recommendations
        .route(
            "/recommendations/:user_id",
            get(handlers::get_recommendations),
        )
        .route(
            "/users/:user_id/history",
            post(handlers::update_watch_history),
        )
        // Catalogue
        .route("/search", get(handlers::search))
        .route("/search/fallback", get(handlers::search_with_fallback))
        .route("/trending", get(handlers::get_trending))
        .route("/titles/:media_type/:id", get(handlers::get_title_details))
        .route("/streaming-services", get(handlers::get_streaming_services))
        // Operations
        .route("/providers/status", get(handlers::get_provider_status))
        .route("/cache", delete(handlers::clear_cache))
}
