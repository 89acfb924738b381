//! Error types for midihands

use thiserror::Error;

/// Main error type for midihands
#[derive(Error, Debug)]
pub enum MidiHandsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Web server error: {0}")]
    Web(#[from] WebError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Socket channel errors (client side)
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Invalid page origin '{origin}': {message}")]
    InvalidOrigin { origin: String, message: String },

    #[error("Connection attempt failed: {0}")]
    Connect(String),

    #[error("Connection attempt timed out after {0} ms")]
    ConnectTimeout(u64),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to encode outbound message: {0}")]
    Encode(String),
}

/// Landmark source errors
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Failed to read replay file: {0}")]
    ReplayRead(String),

    #[error("Replay parse error on line {line}: {message}")]
    ReplayParse { line: usize, message: String },
}

/// Control output errors
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Unknown control output: {0}")]
    UnknownOutput(String),

    #[error("MIDI device error: {0}")]
    Device(String),

    #[error("Failed to send control change: {0}")]
    Send(String),
}

/// Web server errors
#[derive(Error, Debug)]
pub enum WebError {
    #[error("Failed to bind to address: {0}")]
    Bind(String),

    #[error("Failed to open browser: {0}")]
    Browser(String),
}

/// Result type alias for midihands operations
pub type Result<T> = std::result::Result<T, MidiHandsError>;
