//! REST API endpoints

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::output::sse;
use crate::AppState;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
        })
    }
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub clients: usize,
    pub frames_received: u64,
    pub frames_processed: u64,
    pub outputs: usize,
}

/// Get current status
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (frames_received, frames_processed) = state.frame_counts();
    let outputs = state.outputs.lock().await.len();

    ApiResponse::success(StatusResponse {
        version: crate::VERSION.to_string(),
        clients: state.client_count(),
        frames_received,
        frames_processed,
        outputs,
    })
}

/// List the announced control outputs
pub async fn list_outputs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let names = state.outputs.lock().await.names();
    ApiResponse::success(names)
}

/// Get current configuration
pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.config.read().await;
    Json(config.clone())
}

/// SSE stream of merged landmark scenes
pub async fn landmark_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    sse::create_scene_stream(state)
}
