//! Hand detection result types
//!
//! Field names follow the hand detector's JSON result object
//! (`multiHandLandmarks`, `multiHandWorldLandmarks`, `multiHandedness`) so a
//! frame can be forwarded to the backend as-is.

use serde::{Deserialize, Serialize};

/// A single landmark position.
///
/// Screen-space landmarks are normalized to [0, 1] in x and y; world-space
/// landmarks are in meters around the hand's center.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }
}

/// Which hand an entity is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    /// Index of the hand in per-hand tables (Left = 0, Right = 1)
    pub fn ordinal(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Right => "Right",
        }
    }
}

impl std::fmt::Display for Handedness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handedness classification of one detected hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub index: u32,
    pub score: f32,
    pub label: Handedness,
}

impl Classification {
    pub fn new(label: Handedness, score: f32) -> Self {
        Self {
            index: label.ordinal() as u32,
            score,
            label,
        }
    }
}

/// One detected hand, borrowed out of a [`DetectionFrame`]
#[derive(Debug, Clone, Copy)]
pub struct Entity<'a> {
    pub landmarks: &'a [Landmark],
    pub classification: &'a Classification,
}

/// Output of one detection cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFrame {
    /// Per-hand screen-space landmarks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_hand_landmarks: Option<Vec<Vec<Landmark>>>,
    /// Per-hand world-space landmarks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_hand_world_landmarks: Option<Vec<Vec<Landmark>>>,
    /// Per-hand classification, index-aligned with the landmark lists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_handedness: Option<Vec<Classification>>,
}

impl DetectionFrame {
    /// A frame in which nothing was detected
    pub fn empty() -> Self {
        Self {
            multi_hand_landmarks: Some(Vec::new()),
            multi_hand_world_landmarks: Some(Vec::new()),
            multi_handedness: Some(Vec::new()),
        }
    }

    /// Number of detected hands.
    ///
    /// Both the screen landmarks and the classifications must be present for
    /// a hand to count.
    pub fn entity_count(&self) -> usize {
        self.screen_entities().len()
    }

    /// Screen-space entities paired with their classification
    pub fn screen_entities(&self) -> Vec<Entity<'_>> {
        match (&self.multi_hand_landmarks, &self.multi_handedness) {
            (Some(landmarks), Some(handedness)) => pair(landmarks, handedness),
            _ => Vec::new(),
        }
    }

    /// World-space entities paired with their classification, or `None` when
    /// the frame carries no world landmarks at all
    pub fn world_entities(&self) -> Option<Vec<Entity<'_>>> {
        let landmarks = self.multi_hand_world_landmarks.as_ref()?;
        let handedness = self.multi_handedness.as_deref().unwrap_or(&[]);
        Some(pair(landmarks, handedness))
    }

    /// Keep at most `max` hands, dropping any whose score is below `min_score`
    pub fn retain_hands(&mut self, max: usize, min_score: f32) {
        let Some(handedness) = &self.multi_handedness else {
            return;
        };
        let keep: Vec<bool> = handedness
            .iter()
            .scan(0usize, |kept, c| {
                let keep = c.score >= min_score && *kept < max;
                if keep {
                    *kept += 1;
                }
                Some(keep)
            })
            .collect();

        retain_by(&mut self.multi_handedness, &keep);
        retain_by(&mut self.multi_hand_landmarks, &keep);
        retain_by(&mut self.multi_hand_world_landmarks, &keep);
    }
}

fn pair<'a>(landmarks: &'a [Vec<Landmark>], handedness: &'a [Classification]) -> Vec<Entity<'a>> {
    landmarks
        .iter()
        .zip(handedness)
        .map(|(landmarks, classification)| Entity {
            landmarks,
            classification,
        })
        .collect()
}

fn retain_by<T>(list: &mut Option<Vec<T>>, keep: &[bool]) {
    if let Some(items) = list {
        let mut flags = keep.iter();
        items.retain(|_| flags.next().copied().unwrap_or(false));
    }
}
