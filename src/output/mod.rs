//! Output module
//!
//! Where merged landmarks and the frontend end up:
//! - Visualization sinks for the 3D landmark grid
//! - Server-Sent Events stream of grid scenes
//! - Opening the frontend in a browser

pub mod browser;
pub mod sse;
pub mod visualization;

pub use visualization::{BroadcastSink, ColorTable, GridScene, LogSink, VisualizationSink};
