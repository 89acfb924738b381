//! Tracking module
//!
//! Hand detection results and what is done with them client side:
//! - Detection frame types (landmarks, handedness)
//! - The shared hand connectivity graph
//! - Multi-hand landmark merging for the 3D grid
//! - The detector seam and a recorded-frame replayer

pub mod connections;
pub mod detector;
pub mod landmarks;
pub mod merge;

pub use connections::{Connection, HAND_CONNECTIONS, HAND_LANDMARK_COUNT};
pub use landmarks::{Classification, DetectionFrame, Entity, Handedness, Landmark};
pub use merge::{merge, merge_frame, ColorAssignment, MergedVisualizationInput};
