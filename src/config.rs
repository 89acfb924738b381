//! Configuration parsing and management for midihands

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::client::endpoint::socket_endpoint;
use crate::error::{ConfigError, MidiHandsError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub detector: DetectorOptions,
    pub processing: ProcessingConfig,
    pub grid: GridConfig,
    pub outputs: OutputsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MidiHandsError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> Result<Self, MidiHandsError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, MidiHandsError> {
        let paths = [
            PathBuf::from("midihands.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), MidiHandsError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "Port must be greater than 0"));
        }

        if let Err(e) = socket_endpoint(&self.client.origin) {
            return Err(invalid("client.origin", &e.to_string()));
        }

        if self.client.inbound_capacity == 0 || self.client.outgoing_capacity == 0 {
            return Err(invalid(
                "client.inbound_capacity/outgoing_capacity",
                "Channel capacities must be greater than 0",
            ));
        }

        if !(1..=4).contains(&self.detector.max_num_hands) {
            return Err(invalid(
                "detector.max_num_hands",
                "Max number of hands must be between 1 and 4",
            ));
        }

        if !(0.0..=1.0).contains(&self.detector.min_detection_confidence) {
            return Err(invalid(
                "detector.min_detection_confidence",
                "Confidence must be between 0.0 and 1.0",
            ));
        }

        if !(0.0..=1.0).contains(&self.detector.min_tracking_confidence) {
            return Err(invalid(
                "detector.min_tracking_confidence",
                "Confidence must be between 0.0 and 1.0",
            ));
        }

        if self.processing.smoothing_window == 0 {
            return Err(invalid(
                "processing.smoothing_window",
                "Smoothing window must hold at least one sample",
            ));
        }

        if self.processing.keep_frame_percent > 100 {
            return Err(invalid(
                "processing.keep_frame_percent",
                "Percentage must be between 0 and 100",
            ));
        }

        if self.processing.spread_min >= self.processing.spread_max {
            return Err(invalid(
                "processing.spread_min",
                "spread_min must be lower than spread_max",
            ));
        }

        if self.processing.keep_frame_percent == 0 {
            tracing::warn!("processing.keep_frame_percent is 0, every frame will be discarded");
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> MidiHandsError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Backend HTTP/WebSocket server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Directory of static frontend files served at `/`
    pub static_dir: PathBuf,
    /// Open the frontend in the default browser on startup
    pub open_browser: bool,
    /// Enable permissive CORS headers
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8030,
            static_dir: PathBuf::from("static"),
            open_browser: true,
            cors_enabled: true,
        }
    }
}

/// Landmark streaming client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Origin of the page the client belongs to; the socket endpoint is derived from it
    pub origin: String,
    /// Preferred output target, selected as soon as the backend announces it
    pub output_target: Option<String>,
    /// Give up on a connection attempt after this many milliseconds (0 = wait forever)
    pub connect_timeout_ms: u64,
    /// Buffered inbound messages before new ones are dropped
    pub inbound_capacity: usize,
    /// Buffered outbound frames before new ones are dropped
    pub outgoing_capacity: usize,
    /// Pause between replayed detection frames in milliseconds
    pub frame_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8030".to_string(),
            output_target: None,
            connect_timeout_ms: 0,
            inbound_capacity: 64,
            outgoing_capacity: 8,
            frame_interval_ms: 33,
        }
    }
}

/// Hand model complexity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelComplexity {
    Lite,
    Full,
}

impl Default for ModelComplexity {
    fn default() -> Self {
        Self::Full
    }
}

/// Live options of the hand detector, mirrored from the control panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    /// Treat the input as a mirrored selfie camera
    pub selfie_mode: bool,
    /// Maximum number of hands reported per frame (1-4)
    pub max_num_hands: usize,
    /// Model complexity
    pub model_complexity: ModelComplexity,
    /// Minimum classification score for a hand to be reported
    pub min_detection_confidence: f32,
    /// Minimum confidence for a hand to keep being tracked
    pub min_tracking_confidence: f32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            selfie_mode: true,
            max_num_hands: 2,
            model_complexity: ModelComplexity::Full,
            min_detection_confidence: 0.6,
            min_tracking_confidence: 0.6,
        }
    }
}

/// Backend hand processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of samples in each moving average
    pub smoothing_window: usize,
    /// Percentage of incoming frames processed (0-100)
    pub keep_frame_percent: u8,
    /// Spread ratio mapped to control value 0
    pub spread_min: f64,
    /// Spread ratio mapped to control value 127
    pub spread_max: f64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 10,
            keep_frame_percent: 90,
            spread_min: 0.85,
            spread_max: 2.3,
        }
    }
}

/// Colors of the merged 3D landmark grid
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Color of connections that have no label color
    pub connection_color: u32,
    /// Color keyed by the "Left" label
    pub left_color: u32,
    /// Color keyed by the "Right" label
    pub right_color: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            connection_color: 0xCCCCCC,
            left_color: 0xFFA500,
            right_color: 0x00FFFF,
        }
    }
}

/// Control output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputsConfig {
    /// Offer an output that only logs control changes
    pub log_output: bool,
    /// Name under which the logging output is announced
    pub log_output_name: String,
    /// Open every available MIDI output port (requires the `midi-device` feature)
    pub midi_devices: bool,
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            log_output: true,
            log_output_name: "midihands log".to_string(),
            midi_devices: true,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("midihands");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/midihands");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/midihands");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("midihands");
        }
    }

    PathBuf::from(".")
}
