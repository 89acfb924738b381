//! Control-change outputs
//!
//! Outputs are looked up by the name the page selected. A logging output is
//! always available; real MIDI ports are opened through `midir` when the
//! `midi-device` feature is enabled.

use std::collections::BTreeMap;

use crate::config::OutputsConfig;
use crate::error::OutputError;

/// Status byte of a control change on channel 0
pub const CONTROL_CHANGE: u8 = 0xB0;

/// A single MIDI control change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlChange {
    pub channel: u8,
    pub controller: u8,
    pub value: u8,
}

impl ControlChange {
    pub fn new(channel: u8, controller: u8, value: u8) -> Self {
        Self {
            channel,
            controller,
            value,
        }
    }

    /// Raw three-byte message
    pub fn to_bytes(&self) -> [u8; 3] {
        [
            CONTROL_CHANGE | (self.channel & 0x0F),
            self.controller & 0x7F,
            self.value & 0x7F,
        ]
    }
}

/// A named destination for control changes
pub trait ControlOutput: Send {
    fn name(&self) -> &str;

    fn send(&mut self, change: &ControlChange) -> Result<(), OutputError>;
}

/// Logs every control change instead of sending it anywhere
#[derive(Debug)]
pub struct LogOutput {
    name: String,
    sent: u64,
}

impl LogOutput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent: 0,
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl ControlOutput for LogOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, change: &ControlChange) -> Result<(), OutputError> {
        self.sent += 1;
        tracing::info!(
            "[{}] cc {} = {} (channel {})",
            self.name,
            change.controller,
            change.value,
            change.channel
        );
        Ok(())
    }
}

#[cfg(feature = "midi-device")]
pub use device::MidiDeviceOutput;

#[cfg(feature = "midi-device")]
mod device {
    use midir::{MidiOutput, MidiOutputConnection};

    use super::{ControlChange, ControlOutput};
    use crate::error::OutputError;

    const CLIENT_NAME: &str = "midihands";

    /// An open MIDI output port
    pub struct MidiDeviceOutput {
        name: String,
        connection: MidiOutputConnection,
    }

    impl MidiDeviceOutput {
        /// Names of the output ports currently available
        pub fn port_names() -> Result<Vec<String>, OutputError> {
            let midi = MidiOutput::new(CLIENT_NAME).map_err(|e| OutputError::Device(e.to_string()))?;
            Ok(midi
                .ports()
                .iter()
                .filter_map(|port| midi.port_name(port).ok())
                .collect())
        }

        /// Open the output port called `name`
        pub fn open(name: &str) -> Result<Self, OutputError> {
            let midi = MidiOutput::new(CLIENT_NAME).map_err(|e| OutputError::Device(e.to_string()))?;
            let port = midi
                .ports()
                .into_iter()
                .find(|port| midi.port_name(port).map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| OutputError::UnknownOutput(name.to_string()))?;

            let connection = midi
                .connect(&port, CLIENT_NAME)
                .map_err(|e| OutputError::Device(format!("{}: {}", name, e)))?;

            Ok(Self {
                name: name.to_string(),
                connection,
            })
        }
    }

    impl ControlOutput for MidiDeviceOutput {
        fn name(&self) -> &str {
            &self.name
        }

        fn send(&mut self, change: &ControlChange) -> Result<(), OutputError> {
            self.connection
                .send(&change.to_bytes())
                .map_err(|e| OutputError::Send(format!("{}: {}", self.name, e)))
        }
    }
}

/// All outputs the backend announces, by name
#[derive(Default)]
pub struct OutputRegistry {
    outputs: BTreeMap<String, Box<dyn ControlOutput>>,
}

impl std::fmt::Debug for OutputRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputRegistry")
            .field("outputs", &self.names())
            .finish()
    }
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every output enabled in `config`. Ports that fail to open are
    /// skipped with a warning.
    pub fn discover(config: &OutputsConfig) -> Self {
        let mut registry = Self::new();

        if config.log_output {
            registry.insert(Box::new(LogOutput::new(config.log_output_name.clone())));
        }

        #[cfg(feature = "midi-device")]
        if config.midi_devices {
            match MidiDeviceOutput::port_names() {
                Ok(names) => {
                    for name in names {
                        match MidiDeviceOutput::open(&name) {
                            Ok(output) => {
                                tracing::info!("MIDI available: {}", name);
                                registry.insert(Box::new(output));
                            }
                            Err(e) => tracing::warn!("Failed to open MIDI output: {}", e),
                        }
                    }
                }
                Err(e) => tracing::error!("MIDI unavailable: {}", e),
            }
        }

        #[cfg(not(feature = "midi-device"))]
        if config.midi_devices {
            tracing::debug!("Built without MIDI device support");
        }

        registry
    }

    /// Add an output, replacing any output with the same name
    pub fn insert(&mut self, output: Box<dyn ControlOutput>) {
        self.outputs.insert(output.name().to_string(), output);
    }

    pub fn names(&self) -> Vec<String> {
        self.outputs.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.outputs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Send `changes` to the output called `name`
    pub fn send(&mut self, name: &str, changes: &[ControlChange]) -> Result<(), OutputError> {
        let output = self
            .outputs
            .get_mut(name)
            .ok_or_else(|| OutputError::UnknownOutput(name.to_string()))?;

        for change in changes {
            output.send(change)?;
        }
        Ok(())
    }
}
