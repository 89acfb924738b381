//! 3D landmark grid sinks
//!
//! A sink receives the merged landmarks of every hand once per detection
//! cycle. Empty input clears the grid.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::GridConfig;
use crate::tracking::{Connection, ColorAssignment, Handedness, Landmark, MergedVisualizationInput};

/// Consumer of merged landmarks
pub trait VisualizationSink: Send {
    fn update_landmarks(
        &mut self,
        landmarks: &[Landmark],
        connections: &[Connection],
        colors: &[ColorAssignment],
    );

    /// Feed one merge result
    fn render(&mut self, merged: &MergedVisualizationInput) {
        self.update_landmarks(&merged.landmarks, &merged.connections, &merged.colors);
    }
}

/// Maps label keys to RGB colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTable {
    pub connection: u32,
    pub left: u32,
    pub right: u32,
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::from_config(&GridConfig::default())
    }
}

impl ColorTable {
    pub fn from_config(config: &GridConfig) -> Self {
        Self {
            connection: config.connection_color,
            left: config.left_color,
            right: config.right_color,
        }
    }

    pub fn color_for(&self, label: Handedness) -> u32 {
        match label {
            Handedness::Left => self.left,
            Handedness::Right => self.right,
        }
    }

    /// Resolve one color per connection; connections outside every color
    /// run get the plain connection color
    pub fn edge_colors(&self, connection_count: usize, colors: &[ColorAssignment]) -> Vec<u32> {
        let mut resolved = vec![self.connection; connection_count];
        for assignment in colors {
            let color = self.color_for(assignment.color);
            for &edge in &assignment.list {
                if let Some(slot) = resolved.get_mut(edge) {
                    *slot = color;
                }
            }
        }
        resolved
    }
}

/// A merged scene with its colors resolved, ready to ship to a renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridScene {
    pub landmarks: Vec<Landmark>,
    pub connections: Vec<Connection>,
    pub colors: Vec<ColorAssignment>,
    /// `#rrggbb` per connection
    pub edge_colors: Vec<String>,
}

impl GridScene {
    pub fn new(
        landmarks: &[Landmark],
        connections: &[Connection],
        colors: &[ColorAssignment],
        table: &ColorTable,
    ) -> Self {
        Self {
            landmarks: landmarks.to_vec(),
            connections: connections.to_vec(),
            colors: colors.to_vec(),
            edge_colors: table
                .edge_colors(connections.len(), colors)
                .into_iter()
                .map(|c| format!("#{:06x}", c))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty() && self.connections.is_empty()
    }
}

/// Publishes every update to broadcast subscribers (the SSE stream)
pub struct BroadcastSink {
    tx: broadcast::Sender<GridScene>,
    table: ColorTable,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<GridScene>, table: ColorTable) -> Self {
        Self { tx, table }
    }
}

impl VisualizationSink for BroadcastSink {
    fn update_landmarks(
        &mut self,
        landmarks: &[Landmark],
        connections: &[Connection],
        colors: &[ColorAssignment],
    ) {
        // No subscribers is fine
        let _ = self
            .tx
            .send(GridScene::new(landmarks, connections, colors, &self.table));
    }
}

/// Logs a summary of every update
#[derive(Debug, Default)]
pub struct LogSink {
    updates: u64,
}

impl LogSink {
    pub fn updates(&self) -> u64 {
        self.updates
    }
}

impl VisualizationSink for LogSink {
    fn update_landmarks(
        &mut self,
        landmarks: &[Landmark],
        connections: &[Connection],
        colors: &[ColorAssignment],
    ) {
        self.updates += 1;
        if landmarks.is_empty() {
            tracing::debug!("Grid cleared");
        } else {
            tracing::debug!(
                "Grid update: {} landmarks, {} connections, {} hands",
                landmarks.len(),
                connections.len(),
                colors.len()
            );
        }
    }
}
