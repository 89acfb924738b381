//! End-to-end: the client channel against a live backend

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use midihands::client::{
    encode, route, ChannelManager, ChannelSettings, ConnectionState, RouteOutcome, UiModel,
    UiSurface,
};
use midihands::config::Config;
use midihands::error::OutputError;
use midihands::midi::{ControlChange, ControlOutput, OutputRegistry};
use midihands::tracking::{Classification, DetectionFrame, Handedness, Landmark};
use midihands::web::WebServer;
use midihands::AppState;

struct Recorder {
    sent: Arc<Mutex<Vec<ControlChange>>>,
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

async fn start_backend() -> (SocketAddr, Arc<AppState>, Arc<Mutex<Vec<ControlChange>>>) {
    let mut config = Config::default();
    config.processing.keep_frame_percent = 100;
    config.server.open_browser = false;

    let sent = Arc::new(Mutex::new(Vec::new()));
    let mut outputs = OutputRegistry::new();
    outputs.insert(Box::new(Recorder {
        sent: Arc::clone(&sent),
    }));

    let state = AppState::with_outputs(config.clone(), outputs);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = WebServer::new(Arc::clone(&state), &config.server);
    tokio::spawn(server.serve(listener));

    (addr, state, sent)
}

fn right_hand_frame() -> DetectionFrame {
    let mut hand = vec![Landmark::new(0.25, 0.75, 0.0); 21];
    hand[0] = Landmark::new(0.25, 0.85, 0.0);
    DetectionFrame {
        multi_hand_landmarks: Some(vec![hand.clone()]),
        multi_hand_world_landmarks: Some(vec![hand]),
        multi_handedness: Some(vec![Classification::new(Handedness::Right, 0.95)]),
    }
}

#[tokio::test]
async fn test_frame_round_trip() {
    let (addr, state, sent) = start_backend().await;

    let channel = ChannelManager::new(&format!("http://{}", addr), ChannelSettings::default())
        .unwrap()
        .connect();
    let handle = channel.handle.clone();
    let mut inbound = channel.inbound;

    tokio::time::timeout(Duration::from_secs(5), handle.wait_for(ConnectionState::Open))
        .await
        .expect("connection did not open");

    // The backend announces its outputs first
    let mut ui = UiModel::new();
    let raw = tokio::time::timeout(Duration::from_secs(5), inbound.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        route(&raw, &mut ui),
        RouteOutcome::OutputAdded("Synth A".to_string())
    );
    assert_eq!(ui.selected_output(), "Synth A");

    let outbound = encode(&right_hand_frame(), &ui.selected_output()).unwrap();
    assert_eq!(
        handle.send(&outbound).unwrap(),
        midihands::client::SendOutcome::Queued
    );

    let raw = tokio::time::timeout(Duration::from_secs(5), inbound.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        route(&raw, &mut ui),
        RouteOutcome::ElementUpdated("right".to_string())
    );
    let readout = ui.element("right").unwrap();
    assert!(readout.starts_with("Right<br>x (cc 3)=32"), "{}", readout);

    // x, y and openness of the right hand were written once each
    let controllers: Vec<u8> = sent.lock().unwrap().iter().map(|c| c.controller).collect();
    assert_eq!(controllers, vec![3, 4, 5]);
    assert_eq!(state.frame_counts(), (1, 1));

    handle.close();
    state.shutdown();
}

#[tokio::test]
async fn test_api_lists_outputs() {
    let (addr, state, _sent) = start_backend().await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /api/outputs HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains(r#"{"success":true,"data":["Synth A"]}"#), "{}", response);

    state.shutdown();
}
