//! Backend web server
//!
//! Serves the frontend, the `/ws` landmark socket, a small JSON API and an SSE
//! stream of merged landmark scenes.

pub mod api;
pub mod routes;
pub mod socket;

use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{MidiHandsError, WebError};
use crate::AppState;

/// HTTP + WebSocket server
pub struct WebServer {
    app_state: Arc<AppState>,
    config: ServerConfig,
}

impl WebServer {
    /// Create a new web server
    pub fn new(app_state: Arc<AppState>, config: &ServerConfig) -> Self {
        Self {
            app_state,
            config: config.clone(),
        }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        routes::create_router(Arc::clone(&self.app_state), &self.config)
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener, MidiHandsError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| WebError::Bind(format!("{}: {}", addr, e)))?;
        Ok(listener)
    }

    /// Serve on `listener` until shutdown is signalled
    pub async fn serve(self, listener: TcpListener) -> Result<(), MidiHandsError> {
        let mut shutdown_rx = self.app_state.subscribe_shutdown();
        let app = self.router();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
