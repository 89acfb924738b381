//! Route definitions for the backend

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::AppState;

use super::api;
use super::socket;

/// Create the main router with all routes
pub fn create_router(app_state: Arc<AppState>, config: &ServerConfig) -> Router {
    let cors = if config.cors_enabled {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        // Landmark socket
        .route("/ws", get(socket::ws_handler))
        // API endpoints (JSON)
        .route("/api/status", get(api::get_status))
        .route("/api/outputs", get(api::list_outputs))
        .route("/api/config", get(api::get_config))
        // SSE stream for the 3D grid
        .route("/api/landmarks/stream", get(api::landmark_stream))
        // Frontend
        .fallback_service(ServeDir::new(&config.static_dir))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
