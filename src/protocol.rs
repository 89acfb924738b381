//! Socket message schema
//!
//! Everything on `/ws` is a UTF-8 JSON text frame. The backend pushes
//! [`InboundMessage`]s tagged by `kind`; the client pushes [`OutboundFrame`]s,
//! which are detection results with the selected output target attached.

use serde::{Deserialize, Serialize};

use crate::tracking::DetectionFrame;

/// Backend to client push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum InboundMessage {
    /// Replace the content of element `ele` with `data`
    #[serde(rename = "updateElement")]
    UpdateElement { ele: String, data: String },

    /// Offer `data` as a selectable output target
    #[serde(rename = "addMidi")]
    AddMidi { data: String },

    /// Any other kind
    #[serde(other)]
    Ignored,
}

impl InboundMessage {
    pub fn update_element(ele: impl Into<String>, data: impl Into<String>) -> Self {
        Self::UpdateElement {
            ele: ele.into(),
            data: data.into(),
        }
    }

    pub fn add_midi(name: impl Into<String>) -> Self {
        Self::AddMidi { data: name.into() }
    }

    /// Decode a raw text frame.
    ///
    /// Never fails: `null`, malformed JSON, a missing `kind` or a known kind
    /// with missing fields all decode to [`InboundMessage::Ignored`].
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<Option<InboundMessage>>(raw) {
            Ok(Some(message)) => message,
            Ok(None) => Self::Ignored,
            Err(e) => {
                tracing::debug!("Ignoring undecodable message: {}", e);
                Self::Ignored
            }
        }
    }
}

/// Client to backend push: one detection result plus the selected output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    #[serde(flatten)]
    pub frame: DetectionFrame,
    /// Name of the selected output target; empty when nothing is selected
    #[serde(rename = "MIDIOut", default)]
    pub midi_out: String,
}
