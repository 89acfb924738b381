//! Server-Sent Events for the merged landmark grid

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::output::visualization::GridScene;
use crate::AppState;

/// Create an SSE stream of merged landmark scenes
pub fn create_scene_stream(
    app_state: Arc<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = app_state.subscribe_scene();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(scene) => scene_to_event(&scene).map(Ok),
        // Lagged subscribers just miss scenes
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn scene_to_event(scene: &GridScene) -> Option<Event> {
    match serde_json::to_string(scene) {
        Ok(data) => Some(Event::default().event("landmarks").data(data)),
        Err(e) => {
            tracing::warn!("Failed to encode scene: {}", e);
            None
        }
    }
}
