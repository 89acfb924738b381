//! Client control loop
//!
//! Two independent event sources meet here: detection frames from the
//! detector and inbound messages from the channel. Every frame is merged for
//! the 3D grid (exactly one sink update per frame) and, when it holds at least
//! one hand, sent to the backend along with the selected output. Every inbound
//! message is routed to the page.

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info};

use crate::client::channel::{ConnectionHandle, SendOutcome};
use crate::client::encoder::encode;
use crate::client::router::{route, RouteOutcome};
use crate::client::ui::UiSurface;
use crate::output::visualization::VisualizationSink;
use crate::tracking::{merge_frame, DetectionFrame, HAND_CONNECTIONS};

/// Running totals of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    /// Frames with no hands, never sent
    pub empty_frames: u64,
    pub sent: u64,
    pub dropped: u64,
    pub messages: u64,
}

pub struct ClientSession<S, V> {
    handle: ConnectionHandle,
    ui: S,
    sink: V,
    stats: SessionStats,
}

impl<S: UiSurface, V: VisualizationSink> ClientSession<S, V> {
    pub fn new(handle: ConnectionHandle, ui: S, sink: V) -> Self {
        Self {
            handle,
            ui,
            sink,
            stats: SessionStats::default(),
        }
    }

    /// Handle one detection cycle. Returns what happened to the outbound
    /// frame, or `None` if the frame had no hands.
    pub fn on_frame(&mut self, frame: &DetectionFrame) -> Option<SendOutcome> {
        self.stats.frames += 1;

        self.sink.render(&merge_frame(frame, &HAND_CONNECTIONS));

        let Some(outbound) = encode(frame, &self.ui.selected_output()) else {
            self.stats.empty_frames += 1;
            return None;
        };

        let outcome = match self.handle.send(&outbound) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to send frame: {}", e);
                SendOutcome::Dropped
            }
        };

        match outcome {
            SendOutcome::Queued => self.stats.sent += 1,
            SendOutcome::Dropped => self.stats.dropped += 1,
        }
        Some(outcome)
    }

    /// Handle one raw inbound message
    pub fn on_message(&mut self, raw: &str) -> RouteOutcome {
        self.stats.messages += 1;
        let outcome = route(raw, &mut self.ui);
        if outcome != RouteOutcome::Ignored {
            debug!("Routed message: {:?}", outcome);
        }
        outcome
    }

    /// Run until the detector stops, the channel stops, or shutdown is
    /// signalled
    pub async fn run(
        mut self,
        mut frames: mpsc::Receiver<DetectionFrame>,
        mut inbound: mpsc::Receiver<String>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Self {
        loop {
            tokio::select! {
                frame = frames.recv() => match frame {
                    Some(frame) => {
                        self.on_frame(&frame);
                    }
                    None => {
                        info!("Detector stream ended");
                        break;
                    }
                },
                message = inbound.recv() => match message {
                    Some(raw) => {
                        self.on_message(&raw);
                    }
                    None => {
                        info!("Channel stopped");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    info!("Client session shutting down");
                    break;
                }
            }
        }

        info!(
            "Session finished: {} frames, {} sent, {} dropped, {} messages",
            self.stats.frames, self.stats.sent, self.stats.dropped, self.stats.messages
        );
        self
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn ui(&self) -> &S {
        &self.ui
    }

    pub fn sink(&self) -> &V {
        &self.sink
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }
}
