//! midihands - hand landmarks to MIDI control
//!
//! Streams hand-landmark detections from a tracking pipeline to a backend over
//! a self-healing WebSocket channel:
//! - Client: resilient channel, inbound message routing, outbound frame
//!   encoding, multi-hand landmark merging for a 3D grid
//! - Backend: per-hand smoothing and mapping onto MIDI control changes,
//!   per-hand readouts pushed back to the page
//! - Replay of recorded detection frames so the client runs headless

pub mod client;
pub mod config;
pub mod error;
pub mod midi;
pub mod output;
pub mod protocol;
pub mod tracking;
pub mod web;

pub use config::Config;
pub use error::{MidiHandsError, Result};

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

use midi::{HandProcessor, OutputRegistry};
use output::{ColorTable, GridScene};

/// Backend state shared by every socket and HTTP handler
#[derive(Debug)]
pub struct AppState {
    /// Current configuration
    pub config: RwLock<Config>,
    /// Announced control outputs
    pub outputs: Mutex<OutputRegistry>,
    /// Hand smoothing and change detection, shared by all pages
    pub processor: Mutex<HandProcessor>,
    /// Colors for published grid scenes
    pub colors: ColorTable,
    /// Channel for merged landmark scenes
    pub scene_tx: broadcast::Sender<GridScene>,
    /// Shutdown signal
    pub shutdown_tx: broadcast::Sender<()>,
    clients: AtomicUsize,
    frames_received: AtomicU64,
    frames_processed: AtomicU64,
}

impl AppState {
    /// Create the state, opening every output enabled in the configuration
    pub fn new(config: Config) -> Arc<Self> {
        let outputs = OutputRegistry::discover(&config.outputs);
        Self::with_outputs(config, outputs)
    }

    /// Create the state with an explicit set of outputs
    pub fn with_outputs(config: Config, outputs: OutputRegistry) -> Arc<Self> {
        let (scene_tx, _) = broadcast::channel(64);
        let (shutdown_tx, _) = broadcast::channel(1);

        Arc::new(Self {
            processor: Mutex::new(HandProcessor::new(&config.processing)),
            colors: ColorTable::from_config(&config.grid),
            config: RwLock::new(config),
            outputs: Mutex::new(outputs),
            scene_tx,
            shutdown_tx,
            clients: AtomicUsize::new(0),
            frames_received: AtomicU64::new(0),
            frames_processed: AtomicU64::new(0),
        })
    }

    /// Publish a merged scene to SSE subscribers
    pub fn publish_scene(&self, scene: GridScene) {
        let _ = self.scene_tx.send(scene);
    }

    /// Subscribe to merged scenes
    pub fn subscribe_scene(&self) -> broadcast::Receiver<GridScene> {
        self.scene_tx.subscribe()
    }

    /// Subscribe to shutdown signal
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Record a new socket client; returns the number now connected
    pub fn client_connected(&self) -> usize {
        self.clients.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn client_disconnected(&self) {
        self.clients.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn client_count(&self) -> usize {
        self.clients.load(Ordering::Relaxed)
    }

    pub fn record_frame(&self, processed: bool) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        if processed {
            self.frames_processed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Frames received and frames kept by sampling
    pub fn frame_counts(&self) -> (u64, u64) {
        (
            self.frames_received.load(Ordering::Relaxed),
            self.frames_processed.load(Ordering::Relaxed),
        )
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
