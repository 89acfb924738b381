//! Hand landmark topology
//!
//! 21 landmarks per hand: the wrist, then four joints for each finger from
//! thumb to pinky.

/// A pair of landmark indices that are drawn connected
pub type Connection = (usize, usize);

/// Landmarks reported for every detected hand
pub const HAND_LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_FINGER_MCP: usize = 5;
pub const INDEX_FINGER_TIP: usize = 8;
pub const MIDDLE_FINGER_MCP: usize = 9;
pub const MIDDLE_FINGER_TIP: usize = 12;
pub const RING_FINGER_MCP: usize = 13;
pub const RING_FINGER_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_TIP: usize = 20;

/// Connectivity graph shared by every hand
pub const HAND_CONNECTIONS: [Connection; 21] = [
    // palm
    (WRIST, 1),
    (WRIST, INDEX_FINGER_MCP),
    (MIDDLE_FINGER_MCP, RING_FINGER_MCP),
    (RING_FINGER_MCP, PINKY_MCP),
    (INDEX_FINGER_MCP, MIDDLE_FINGER_MCP),
    (WRIST, PINKY_MCP),
    // thumb
    (1, 2),
    (2, 3),
    (3, THUMB_TIP),
    // index
    (INDEX_FINGER_MCP, 6),
    (6, 7),
    (7, INDEX_FINGER_TIP),
    // middle
    (MIDDLE_FINGER_MCP, 10),
    (10, 11),
    (11, MIDDLE_FINGER_TIP),
    // ring
    (RING_FINGER_MCP, 14),
    (14, 15),
    (15, RING_FINGER_TIP),
    // pinky
    (PINKY_MCP, 18),
    (18, 19),
    (19, PINKY_TIP),
];
