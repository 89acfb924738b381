//! Hand to controller processing
//!
//! Each hand drives three controllers: `hand * 3 + axis`, with Left = 0,
//! Right = 1 and axes x, y, openness. Features are smoothed per hand label
//! before mapping, and a controller is only re-sent when its value changes.

use crate::config::ProcessingConfig;
use crate::midi::features::{linlin, to_controller_value, HandFeatures, MovingAverage};
use crate::midi::output::ControlChange;
use crate::protocol::InboundMessage;
use crate::tracking::{Classification, DetectionFrame, Handedness, Landmark};

const AXES: usize = 3;
const AXIS_NAMES: [&str; AXES] = ["x", "y", "o"];

/// Controller values computed for one hand in one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandReadout {
    pub hand: Handedness,
    /// x, y, openness; each 0..=127
    pub values: [u8; AXES],
}

impl HandReadout {
    /// Controller number of `axis` for this hand
    pub fn controller(&self, axis: usize) -> u8 {
        (self.hand.ordinal() * AXES + axis) as u8
    }

    /// Id of the page element showing this hand
    pub fn element_id(&self) -> String {
        self.hand.as_str().to_lowercase()
    }

    /// Readout markup, e.g. `Left<br>x (cc 0)=64<br>y (cc 1)=80<br>o (cc 2)=12`
    pub fn html(&self) -> String {
        let mut html = self.hand.to_string();
        for (axis, name) in AXIS_NAMES.iter().enumerate() {
            html.push_str(&format!(
                "<br>{} (cc {})={}",
                name,
                self.controller(axis),
                self.values[axis]
            ));
        }
        html
    }

    /// Page update message for this readout
    pub fn to_message(&self) -> InboundMessage {
        InboundMessage::update_element(self.element_id(), self.html())
    }
}

/// Stateful processor shared by every connected page
#[derive(Debug, Clone)]
pub struct HandProcessor {
    config: ProcessingConfig,
    smoothers: [[MovingAverage; AXES]; 2],
    last_sent: [Option<u8>; 2 * AXES],
}

impl HandProcessor {
    pub fn new(config: &ProcessingConfig) -> Self {
        let window = config.smoothing_window;
        Self {
            config: config.clone(),
            smoothers: std::array::from_fn(|_| std::array::from_fn(|_| MovingAverage::new(window))),
            last_sent: [None; 2 * AXES],
        }
    }

    /// Smooth and map one hand
    pub fn process(
        &mut self,
        landmarks: &[Landmark],
        classification: &Classification,
    ) -> Option<HandReadout> {
        let Some(features) = HandFeatures::extract(landmarks) else {
            tracing::debug!(
                "Skipping {} hand with {} landmarks",
                classification.label,
                landmarks.len()
            );
            return None;
        };

        let [x, y, spread] = &mut self.smoothers[classification.label.ordinal()];
        let x = x.push(features.center_x);
        // screen y grows downwards
        let y = 1.0 - y.push(features.center_y);
        let openness = linlin(
            spread.push(features.spread),
            self.config.spread_min,
            self.config.spread_max,
            0.0,
            1.0,
        );

        Some(HandReadout {
            hand: classification.label,
            values: [
                to_controller_value(x),
                to_controller_value(y),
                to_controller_value(openness),
            ],
        })
    }

    /// Process every hand of a frame, in frame order
    pub fn process_frame(&mut self, frame: &DetectionFrame) -> Vec<HandReadout> {
        frame
            .screen_entities()
            .into_iter()
            .filter_map(|entity| self.process(entity.landmarks, entity.classification))
            .collect()
    }

    /// Control changes for the values of `readout` that differ from what was
    /// last sent; they are recorded as sent
    pub fn take_changes(&mut self, readout: &HandReadout) -> Vec<ControlChange> {
        let mut changes = Vec::new();
        for (axis, &value) in readout.values.iter().enumerate() {
            let controller = readout.controller(axis);
            let last = &mut self.last_sent[controller as usize];
            if *last != Some(value) {
                *last = Some(value);
                changes.push(ControlChange::new(0, controller, value));
            }
        }
        changes
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::connections::{MIDDLE_FINGER_TIP, PINKY_MCP, WRIST};
    use crate::tracking::HAND_LANDMARK_COUNT;

    /// A hand centred on (cx, cy) whose openness ratio is `ratio`
    fn hand(cx: f32, cy: f32, ratio: f32) -> Vec<Landmark> {
        let mut landmarks = vec![Landmark::new(cx, cy, 0.0); HAND_LANDMARK_COUNT];
        landmarks[WRIST] = Landmark::new(cx, cy + 0.1, 0.0);
        landmarks[PINKY_MCP] = Landmark::new(cx, cy, 0.0);
        landmarks[MIDDLE_FINGER_TIP] = Landmark::new(cx, cy + 0.1 - 0.1 * ratio, 0.0);
        // keep the mean on the centre
        landmarks[1] = Landmark::new(cx, cy - 0.1, 0.0);
        landmarks[2] = Landmark::new(cx, cy + 0.1 * (ratio - 1.0), 0.0);
        landmarks
    }

    fn left() -> Classification {
        Classification::new(Handedness::Left, 0.9)
    }

    fn right() -> Classification {
        Classification::new(Handedness::Right, 0.9)
    }

    #[test]
    fn test_readout_controllers_and_markup() {
        let readout = HandReadout {
            hand: Handedness::Right,
            values: [10, 20, 30],
        };
        assert_eq!(readout.controller(0), 3);
        assert_eq!(readout.controller(2), 5);
        assert_eq!(readout.element_id(), "right");
        assert_eq!(readout.html(), "Right<br>x (cc 3)=10<br>y (cc 4)=20<br>o (cc 5)=30");
        assert_eq!(
            readout.to_message(),
            InboundMessage::update_element("right", "Right<br>x (cc 3)=10<br>y (cc 4)=20<br>o (cc 5)=30")
        );
    }

    #[test]
    fn test_process_maps_position() {
        let mut processor = HandProcessor::new(&ProcessingConfig::default());
        let readout = processor.process(&hand(0.25, 0.25, 1.0), &left()).unwrap();

        assert_eq!(readout.hand, Handedness::Left);
        assert_eq!(readout.values[0], 32); // 0.25 * 127
        assert_eq!(readout.values[1], 95); // (1 - 0.25) * 127
    }

    #[test]
    fn test_openness_is_clamped_to_range() {
        let mut processor = HandProcessor::new(&ProcessingConfig {
            smoothing_window: 1,
            ..ProcessingConfig::default()
        });

        let closed = processor.process(&hand(0.5, 0.5, 0.5), &left()).unwrap();
        assert_eq!(closed.values[2], 0);

        let open = processor.process(&hand(0.5, 0.5, 3.0), &left()).unwrap();
        assert_eq!(open.values[2], 127);
    }

    #[test]
    fn test_smoothing_is_per_hand() {
        let mut processor = HandProcessor::new(&ProcessingConfig {
            smoothing_window: 2,
            ..ProcessingConfig::default()
        });

        processor.process(&hand(0.0, 0.5, 1.0), &left());
        let right_readout = processor.process(&hand(1.0, 0.5, 1.0), &right()).unwrap();
        // right hand average is not pulled towards the left hand
        assert_eq!(right_readout.values[0], 127);

        let left_readout = processor.process(&hand(1.0, 0.5, 1.0), &left()).unwrap();
        assert_eq!(left_readout.values[0], 64); // mean of 0.0 and 1.0
    }

    #[test]
    fn test_take_changes_only_reports_new_values() {
        let mut processor = HandProcessor::new(&ProcessingConfig::default());
        let readout = HandReadout {
            hand: Handedness::Left,
            values: [10, 20, 30],
        };

        let changes = processor.take_changes(&readout);
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[1], ControlChange::new(0, 1, 20));

        assert!(processor.take_changes(&readout).is_empty());

        let moved = HandReadout {
            values: [10, 21, 30],
            ..readout
        };
        assert_eq!(processor.take_changes(&moved), vec![ControlChange::new(0, 1, 21)]);

        // the other hand has its own controllers
        let other = HandReadout {
            hand: Handedness::Right,
            values: [10, 21, 30],
        };
        let changes = processor.take_changes(&other);
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].controller, 3);
    }

    #[test]
    fn test_process_frame_skips_incomplete_hands() {
        let mut processor = HandProcessor::new(&ProcessingConfig::default());
        let frame = DetectionFrame {
            multi_hand_landmarks: Some(vec![hand(0.5, 0.5, 1.0), vec![Landmark::default(); 5]]),
            multi_hand_world_landmarks: None,
            multi_handedness: Some(vec![left(), right()]),
        };
        let readouts = processor.process_frame(&frame);
        assert_eq!(readouts.len(), 1);
        assert_eq!(readouts[0].hand, Handedness::Left);
    }
}
