//! Hand to MIDI control
//!
//! Backend side processing of incoming detection frames:
//! - Per-hand feature extraction and moving-average smoothing
//! - Mapping onto 7-bit controllers with change detection
//! - Named control-change outputs

pub mod features;
pub mod output;
pub mod processor;

pub use features::{HandFeatures, MovingAverage};
pub use output::{ControlChange, ControlOutput, LogOutput, OutputRegistry};
pub use processor::{HandProcessor, HandReadout};

#[cfg(feature = "midi-device")]
pub use output::MidiDeviceOutput;
