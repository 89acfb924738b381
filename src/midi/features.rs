//! Per-hand features and smoothing
//!
//! A hand is reduced to three numbers: the mean landmark position in x and y,
//! and how open it is. Openness is the wrist to middle fingertip distance over
//! the wrist to pinky knuckle distance, so it does not depend on how far the
//! hand is from the camera.

use std::collections::VecDeque;

use crate::tracking::connections::{MIDDLE_FINGER_TIP, PINKY_MCP, WRIST};
use crate::tracking::{Landmark, HAND_LANDMARK_COUNT};

/// Raw features of one hand, in screen space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandFeatures {
    pub center_x: f64,
    pub center_y: f64,
    pub spread: f64,
}

impl HandFeatures {
    /// Extract features from a full set of screen landmarks.
    ///
    /// `None` for incomplete hands or a degenerate palm (wrist on top of the
    /// pinky knuckle).
    pub fn extract(landmarks: &[Landmark]) -> Option<Self> {
        if landmarks.len() < HAND_LANDMARK_COUNT {
            return None;
        }

        let n = landmarks.len() as f64;
        let center_x = landmarks.iter().map(|l| l.x as f64).sum::<f64>() / n;
        let center_y = landmarks.iter().map(|l| l.y as f64).sum::<f64>() / n;

        let palm = dist(&landmarks[WRIST], &landmarks[PINKY_MCP]);
        if palm <= f64::EPSILON {
            return None;
        }
        let spread = dist(&landmarks[WRIST], &landmarks[MIDDLE_FINGER_TIP]) / palm;

        Some(Self {
            center_x,
            center_y,
            spread,
        })
    }
}

/// Distance between two landmarks in the image plane
pub fn dist(a: &Landmark, b: &Landmark) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Linear map of `value` from `[src_lo, src_hi]` onto `[dst_lo, dst_hi]`,
/// clamped at both ends
pub fn linlin(value: f64, src_lo: f64, src_hi: f64, dst_lo: f64, dst_hi: f64) -> f64 {
    if value <= src_lo {
        dst_lo
    } else if value >= src_hi {
        dst_hi
    } else {
        (value - src_lo) / (src_hi - src_lo) * (dst_hi - dst_lo) + dst_lo
    }
}

/// Map a unit value onto a 7-bit controller value
pub fn to_controller_value(value: f64) -> u8 {
    (value * 127.0).round().clamp(0.0, 127.0) as u8
}

/// Mean of the last `window` samples
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    samples: VecDeque<f64>,
    sum: f64,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    /// Add a sample and return the new average
    pub fn push(&mut self, value: f64) -> f64 {
        if self.samples.len() == self.window {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
            }
        }
        self.samples.push_back(value);
        self.sum += value;
        self.average()
    }

    /// Average of the samples seen so far, 0 before the first one
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum / self.samples.len() as f64
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_hand() -> Vec<Landmark> {
        let mut hand = vec![Landmark::new(0.5, 0.5, 0.0); HAND_LANDMARK_COUNT];
        hand[WRIST] = Landmark::new(0.5, 0.8, 0.0);
        hand[PINKY_MCP] = Landmark::new(0.6, 0.7, 0.0);
        hand[MIDDLE_FINGER_TIP] = Landmark::new(0.5, 0.5, 0.0);
        hand
    }

    #[test]
    fn test_extract_spread() {
        let features = HandFeatures::extract(&open_hand()).unwrap();
        // 0.3 / sqrt(0.02)
        assert!((features.spread - 0.3 / 0.02f64.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_extract_center() {
        let hand: Vec<Landmark> = (0..HAND_LANDMARK_COUNT)
            .map(|i| Landmark::new(i as f32 / 20.0, 0.25, 0.0))
            .collect();
        let features = HandFeatures::extract(&hand).unwrap();
        assert!((features.center_x - 0.5).abs() < 1e-6);
        assert!((features.center_y - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_extract_rejects_incomplete_or_degenerate_hands() {
        assert!(HandFeatures::extract(&open_hand()[..10]).is_none());
        let flat = vec![Landmark::new(0.5, 0.5, 0.0); HAND_LANDMARK_COUNT];
        assert!(HandFeatures::extract(&flat).is_none());
    }

    #[test]
    fn test_linlin() {
        assert_eq!(linlin(0.5, 0.85, 2.3, 0.0, 1.0), 0.0);
        assert_eq!(linlin(3.0, 0.85, 2.3, 0.0, 1.0), 1.0);
        assert!((linlin(1.575, 0.85, 2.3, 0.0, 1.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_controller_value_is_clamped() {
        assert_eq!(to_controller_value(-0.2), 0);
        assert_eq!(to_controller_value(0.5), 64);
        assert_eq!(to_controller_value(1.0), 127);
        assert_eq!(to_controller_value(1.4), 127);
    }

    #[test]
    fn test_moving_average() {
        let mut avg = MovingAverage::new(3);
        assert_eq!(avg.average(), 0.0);
        assert_eq!(avg.push(3.0), 3.0);
        assert_eq!(avg.push(6.0), 4.5);
        assert_eq!(avg.push(9.0), 6.0);
        // oldest sample falls out
        assert_eq!(avg.push(12.0), 9.0);
        assert_eq!(avg.len(), 3);
    }
}
