//! Inbound message router

use crate::client::ui::UiSurface;
use crate::protocol::InboundMessage;

/// Side effect a routed message had on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    ElementUpdated(String),
    /// The target element does not exist; nothing changed
    ElementMissing(String),
    OutputAdded(String),
    Ignored,
}

/// Decode one raw inbound text frame and apply it to `ui`
pub fn route<S: UiSurface + ?Sized>(raw: &str, ui: &mut S) -> RouteOutcome {
    dispatch(InboundMessage::decode(raw), ui)
}

pub fn dispatch<S: UiSurface + ?Sized>(message: InboundMessage, ui: &mut S) -> RouteOutcome {
    match message {
        InboundMessage::UpdateElement { ele, data } => {
            if ui.update_element(&ele, &data) {
                RouteOutcome::ElementUpdated(ele)
            } else {
                tracing::debug!("No element '{}' to update", ele);
                RouteOutcome::ElementMissing(ele)
            }
        }
        InboundMessage::AddMidi { data } => {
            ui.append_output_option(&data);
            RouteOutcome::OutputAdded(data)
        }
        InboundMessage::Ignored => RouteOutcome::Ignored,
    }
}
