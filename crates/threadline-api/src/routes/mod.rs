pub mod chat;
pub mod dto;
pub mod health;
pub mod shares;
pub mod threads;
pub mod title;
pub mod upload;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{config::CorsConfig, middleware::logging, openapi::ApiDoc, state::AppState};

/// Full application router with middleware
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Chat
        .route("/chat", post(chat::chat))
        .route("/thread/title", post(title::generate_title))
        // Uploads
        .route(
            "/upload",
            post(upload::upload_files).layer(DefaultBodyLimit::max(state.config.upload_body_limit())),
        )
        // Threads
        .route("/threads", get(threads::list_threads))
        .route(
            "/threads/:thread_id",
            get(threads::get_thread).delete(threads::delete_thread),
        )
        .route("/threads/:thread_id/messages", get(threads::list_messages))
        // Shares
        .route("/shares", post(shares::create_share).get(shares::list_shares))
        .route(
            "/shares/:share_id",
            get(shares::get_share).delete(shares::delete_share),
        )
        .route("/openapi.json", get(openapi_json));

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes)
        .layer(middleware::from_fn(logging::log_request))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    if !config.enabled {
        return CorsLayer::permissive();
    }

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if config.origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}
