//! Outbound frame encoder

use crate::protocol::OutboundFrame;
use crate::tracking::DetectionFrame;

/// Package a detection result for the backend.
///
/// Frames without a single detected hand are not sent at all.
pub fn encode(frame: &DetectionFrame, target: &str) -> Option<OutboundFrame> {
    if frame.entity_count() == 0 {
        return None;
    }

    Some(OutboundFrame {
        frame: frame.clone(),
        midi_out: target.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{Classification, Handedness, Landmark};

    fn frame(hands: usize) -> DetectionFrame {
        let hand = vec![Landmark::new(0.5, 0.5, 0.0); 21];
        DetectionFrame {
            multi_hand_landmarks: Some(vec![hand.clone(); hands]),
            multi_hand_world_landmarks: Some(vec![hand; hands]),
            multi_handedness: Some(
                (0..hands)
                    .map(|i| {
                        let label = if i % 2 == 0 { Handedness::Left } else { Handedness::Right };
                        Classification::new(label, 0.9)
                    })
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_empty_frame_is_omitted() {
        assert!(encode(&frame(0), "Synth A").is_none());
        assert!(encode(&DetectionFrame::default(), "Synth A").is_none());
    }

    #[test]
    fn test_frame_carries_target() {
        for hands in 1..=4 {
            let outbound = encode(&frame(hands), "Synth A").unwrap();
            assert_eq!(outbound.midi_out, "Synth A");
            assert_eq!(outbound.frame.entity_count(), hands);
        }
    }

    #[test]
    fn test_landmarks_without_handedness_are_omitted() {
        let mut f = frame(1);
        f.multi_handedness = None;
        assert!(encode(&f, "").is_none());
    }
}
