//! Multi-hand landmark merging
//!
//! A 3D grid renderer takes a single landmark list, a single connection list
//! and a list of colored connection runs per update. Each hand is indexed from
//! zero on its own, so the hands are concatenated and every hand's copy of the
//! shared connectivity graph is shifted by the number of landmarks that
//! precede it.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::connections::Connection;
use super::landmarks::{DetectionFrame, Entity, Handedness, Landmark};

/// Connection indices contributed by one hand, and the color key to draw them with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorAssignment {
    /// Indices into the merged connection list
    pub list: Vec<usize>,
    /// Color key, looked up in the sink's label to color table
    pub color: Handedness,
}

impl ColorAssignment {
    /// The contiguous range of merged connection indices this entry covers
    pub fn range(&self) -> Range<usize> {
        match (self.list.first(), self.list.last()) {
            (Some(&first), Some(&last)) => first..last + 1,
            _ => 0..0,
        }
    }
}

/// Everything a single renderer update needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedVisualizationInput {
    pub landmarks: Vec<Landmark>,
    pub connections: Vec<Connection>,
    pub colors: Vec<ColorAssignment>,
}

impl MergedVisualizationInput {
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty() && self.connections.is_empty() && self.colors.is_empty()
    }
}

/// Merge any number of hands that share one connectivity graph.
///
/// Hand `i` with `L` landmarks per hand owns landmarks `[i*L, (i+1)*L)` and
/// connections `[i*E, (i+1)*E)` where `E = graph.len()`; its connections are
/// the graph's pairs shifted by `i*L`.
pub fn merge(entities: &[Entity<'_>], graph: &[Connection]) -> MergedVisualizationInput {
    let landmark_total: usize = entities.iter().map(|e| e.landmarks.len()).sum();
    let mut merged = MergedVisualizationInput {
        landmarks: Vec::with_capacity(landmark_total),
        connections: Vec::with_capacity(entities.len() * graph.len()),
        colors: Vec::with_capacity(entities.len()),
    };

    let per_entity = entities.first().map(|e| e.landmarks.len()).unwrap_or(0);

    for (i, entity) in entities.iter().enumerate() {
        if entity.landmarks.len() != per_entity {
            tracing::warn!(
                "Hand {} has {} landmarks, expected {}",
                i,
                entity.landmarks.len(),
                per_entity
            );
        }

        // Offset is where this hand's landmarks begin in the merged list.
        let offset = merged.landmarks.len();
        merged.landmarks.extend_from_slice(entity.landmarks);

        let first_edge = merged.connections.len();
        merged
            .connections
            .extend(graph.iter().map(|&(a, b)| (a + offset, b + offset)));

        merged.colors.push(ColorAssignment {
            list: (first_edge..merged.connections.len()).collect(),
            color: entity.classification.label,
        });
    }

    merged
}

/// Merge the world landmarks of a frame; a frame without world landmarks
/// yields an empty scene
pub fn merge_frame(frame: &DetectionFrame, graph: &[Connection]) -> MergedVisualizationInput {
    match frame.world_entities() {
        Some(entities) => merge(&entities, graph),
        None => MergedVisualizationInput::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::connections::{HAND_CONNECTIONS, HAND_LANDMARK_COUNT};
    use crate::tracking::landmarks::Classification;

    fn hand(seed: f32, count: usize) -> Vec<Landmark> {
        (0..count)
            .map(|i| Landmark::new(seed + i as f32, seed, 0.0))
            .collect()
    }

    const SMALL_GRAPH: [Connection; 5] = [(0, 1), (1, 2), (2, 3), (0, 5), (5, 20)];

    #[test]
    fn test_empty_input_gives_empty_scene() {
        let merged = merge(&[], &HAND_CONNECTIONS);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_two_hands_small_graph() {
        let left = hand(0.0, HAND_LANDMARK_COUNT);
        let right = hand(100.0, HAND_LANDMARK_COUNT);
        let left_class = Classification::new(Handedness::Left, 0.9);
        let right_class = Classification::new(Handedness::Right, 0.9);
        let entities = [
            Entity {
                landmarks: &left,
                classification: &left_class,
            },
            Entity {
                landmarks: &right,
                classification: &right_class,
            },
        ];

        let merged = merge(&entities, &SMALL_GRAPH);

        assert_eq!(merged.landmarks.len(), 42);
        assert_eq!(merged.connections.len(), 10);
        assert_eq!(&merged.connections[..5], &SMALL_GRAPH[..]);
        for (k, &(a, b)) in merged.connections[5..].iter().enumerate() {
            assert_eq!((a, b), (SMALL_GRAPH[k].0 + 21, SMALL_GRAPH[k].1 + 21));
        }

        assert_eq!(merged.colors.len(), 2);
        assert_eq!(merged.colors[0].range(), 0..5);
        assert_eq!(merged.colors[0].color, Handedness::Left);
        assert_eq!(merged.colors[1].range(), 5..10);
        assert_eq!(merged.colors[1].color, Handedness::Right);

        // landmark k of hand i sits at i*21 + k
        assert_eq!(merged.landmarks[21], right[0]);
        assert_eq!(merged.landmarks[41], right[20]);
    }

    #[test]
    fn test_color_runs_partition_connections() {
        let classes = [
            Classification::new(Handedness::Left, 0.9),
            Classification::new(Handedness::Right, 0.8),
            Classification::new(Handedness::Left, 0.7),
            Classification::new(Handedness::Right, 0.6),
        ];
        let hands: Vec<Vec<Landmark>> = (0..4).map(|i| hand(i as f32, HAND_LANDMARK_COUNT)).collect();

        for n in 0..=4 {
            let entities: Vec<Entity<'_>> = hands[..n]
                .iter()
                .zip(&classes)
                .map(|(landmarks, classification)| Entity {
                    landmarks,
                    classification,
                })
                .collect();

            let merged = merge(&entities, &HAND_CONNECTIONS);
            let e = HAND_CONNECTIONS.len();

            assert_eq!(merged.landmarks.len(), n * HAND_LANDMARK_COUNT);
            assert_eq!(merged.connections.len(), n * e);
            assert_eq!(merged.colors.len(), n);

            let mut next = 0;
            for (i, color) in merged.colors.iter().enumerate() {
                assert_eq!(color.list, (next..next + e).collect::<Vec<_>>());
                assert_eq!(color.color, classes[i].label);
                next += e;
            }
            assert_eq!(next, n * e);

            for (i, chunk) in merged.connections.chunks(e).enumerate() {
                let shift = i * HAND_LANDMARK_COUNT;
                for (&(a, b), &(ga, gb)) in chunk.iter().zip(HAND_CONNECTIONS.iter()) {
                    assert_eq!((a, b), (ga + shift, gb + shift));
                }
            }
        }
    }

    #[test]
    fn test_merge_frame_without_world_landmarks() {
        let frame = DetectionFrame {
            multi_hand_landmarks: Some(vec![hand(0.0, HAND_LANDMARK_COUNT)]),
            multi_hand_world_landmarks: None,
            multi_handedness: Some(vec![Classification::new(Handedness::Left, 0.9)]),
        };
        assert!(merge_frame(&frame, &HAND_CONNECTIONS).is_empty());
    }

    #[test]
    fn test_merge_frame_uses_world_landmarks() {
        let world = hand(7.0, HAND_LANDMARK_COUNT);
        let frame = DetectionFrame {
            multi_hand_landmarks: Some(vec![hand(0.0, HAND_LANDMARK_COUNT)]),
            multi_hand_world_landmarks: Some(vec![world.clone()]),
            multi_handedness: Some(vec![Classification::new(Handedness::Right, 0.9)]),
        };

        let merged = merge_frame(&frame, &HAND_CONNECTIONS);
        assert_eq!(merged.landmarks, world);
        assert_eq!(merged.colors[0].color, Handedness::Right);
    }
}
