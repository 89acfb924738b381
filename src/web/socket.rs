//! `/ws` socket sessions
//!
//! On connect the backend announces every control output, then reads
//! detection frames until the page goes away. Each kept frame updates the
//! shared hand processor, gets one readout message back per hand, and writes
//! changed controller values to the output the page selected.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::output::GridScene;
use crate::protocol::{InboundMessage, OutboundFrame};
use crate::tracking::{merge_frame, HAND_CONNECTIONS};
use crate::AppState;

/// Upgrade handler for `/ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connected = state.client_connected();
    info!("Client connected ({} connected)", connected);

    let (mut sender, mut receiver) = socket.split();
    let mut shutdown_rx = state.subscribe_shutdown();

    let names = state.outputs.lock().await.names();
    for name in names {
        if !send_message(&mut sender, &InboundMessage::add_midi(name)).await {
            state.client_disconnected();
            return;
        }
    }

    'session: loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let frame = match serde_json::from_str::<OutboundFrame>(&text) {
                        Ok(frame) => frame,
                        Err(e) => {
                            debug!("Ignoring malformed frame: {}", e);
                            continue;
                        }
                    };

                    for reply in process_frame(&state, frame).await {
                        if !send_message(&mut sender, &reply).await {
                            break 'session;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Socket read error: {}", e);
                    break;
                }
            },
            _ = shutdown_rx.recv() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state.client_disconnected();
    info!("Client disconnected");
}

async fn send_message(sender: &mut SplitSink<WebSocket, Message>, message: &InboundMessage) -> bool {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode message: {}", e);
            return true;
        }
    };

    match sender.send(Message::Text(text)).await {
        Ok(()) => true,
        Err(e) => {
            debug!("Socket write error: {}", e);
            false
        }
    }
}

/// Whether a frame survives sampling at `keep_percent`
pub fn keep_frame(keep_percent: u8) -> bool {
    match keep_percent {
        0 => false,
        p if p >= 100 => true,
        p => rand::thread_rng().gen_range(0..100u8) < p,
    }
}

/// Run one incoming frame through the backend and return the messages to
/// push back to the page
pub async fn process_frame(state: &AppState, frame: OutboundFrame) -> Vec<InboundMessage> {
    let keep_percent = state.config.read().await.processing.keep_frame_percent;
    let kept = keep_frame(keep_percent);
    state.record_frame(kept);
    if !kept {
        return Vec::new();
    }

    let merged = merge_frame(&frame.frame, &HAND_CONNECTIONS);
    state.publish_scene(GridScene::new(
        &merged.landmarks,
        &merged.connections,
        &merged.colors,
        &state.colors,
    ));

    let mut processor = state.processor.lock().await;
    let readouts = processor.process_frame(&frame.frame);

    let mut outputs = state.outputs.lock().await;
    let target = frame.midi_out.as_str();
    let deliver = outputs.contains(target);
    if !deliver && !target.is_empty() {
        debug!("Selected output '{}' is not available", target);
    }

    let mut replies = Vec::with_capacity(readouts.len());
    for readout in &readouts {
        replies.push(readout.to_message());

        if deliver {
            let changes = processor.take_changes(readout);
            if changes.is_empty() {
                continue;
            }
            if let Err(e) = outputs.send(target, &changes) {
                warn!("Failed to write control changes: {}", e);
            }
        }
    }

    replies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::midi::{ControlChange, ControlOutput, OutputRegistry};
    use crate::error::OutputError;
    use crate::tracking::{Classification, DetectionFrame, Handedness, Landmark};
    use std::sync::Mutex as StdMutex;

    struct Recorder {
        sent: Arc<StdMutex<Vec<ControlChange>>>,
    }

    impl ControlOutput for Recorder {
        fn name(&self) -> &str {
            "Synth A"
        }

        fn send(&mut self, change: &ControlChange) -> Result<(), OutputError> {
            self.sent.lock().unwrap().push(*change);
            Ok(())
        }
    }

    fn state_with_recorder() -> (Arc<AppState>, Arc<StdMutex<Vec<ControlChange>>>) {
        let mut config = Config::default();
        config.processing.keep_frame_percent = 100;

        let sent = Arc::new(StdMutex::new(Vec::new()));
        let mut outputs = OutputRegistry::new();
        outputs.insert(Box::new(Recorder {
            sent: Arc::clone(&sent),
        }));

        (AppState::with_outputs(config, outputs), sent)
    }

    fn frame(target: &str) -> OutboundFrame {
        let mut hand = vec![Landmark::new(0.5, 0.5, 0.0); 21];
        hand[0] = Landmark::new(0.5, 0.6, 0.0);
        OutboundFrame {
            frame: DetectionFrame {
                multi_hand_landmarks: Some(vec![hand.clone()]),
                multi_hand_world_landmarks: Some(vec![hand]),
                multi_handedness: Some(vec![Classification::new(Handedness::Left, 0.9)]),
            },
            midi_out: target.to_string(),
        }
    }

    #[test]
    fn test_keep_frame_bounds() {
        for _ in 0..100 {
            assert!(keep_frame(100));
            assert!(!keep_frame(0));
        }
    }

    #[tokio::test]
    async fn test_frame_produces_readout() {
        let (state, sent) = state_with_recorder();
        let replies = process_frame(&state, frame("")).await;

        assert_eq!(replies.len(), 1);
        match &replies[0] {
            InboundMessage::UpdateElement { ele, data } => {
                assert_eq!(ele, "left");
                assert!(data.starts_with("Left<br>x (cc 0)=64"));
            }
            other => panic!("unexpected reply: {:?}", other),
        }
        // nothing selected, nothing written
        assert!(sent.lock().unwrap().is_empty());
        assert_eq!(state.frame_counts(), (1, 1));
    }

    #[tokio::test]
    async fn test_changes_go_to_selected_output_once() {
        let (state, sent) = state_with_recorder();

        process_frame(&state, frame("Synth A")).await;
        assert_eq!(sent.lock().unwrap().len(), 3);

        // same hand again: no controller moved
        process_frame(&state, frame("Synth A")).await;
        assert_eq!(sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_output_is_skipped() {
        let (state, sent) = state_with_recorder();
        let replies = process_frame(&state, frame("Synth B")).await;
        assert_eq!(replies.len(), 1);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_kept_frame_publishes_scene() {
        let (state, _sent) = state_with_recorder();
        let mut scenes = state.subscribe_scene();
        process_frame(&state, frame("")).await;
        let scene = scenes.try_recv().unwrap();
        assert_eq!(scene.landmarks.len(), 21);
        assert_eq!(scene.connections.len(), HAND_CONNECTIONS.len());
    }
}
