//! Hand detector collaborator
//!
//! The detector itself lives outside this crate. [`Detector`] is the seam it
//! plugs into; [`ReplayDetector`] replays frames recorded as JSON lines so the
//! client pipeline can run without a camera.

use std::path::Path;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};

use crate::config::DetectorOptions;
use crate::error::{MidiHandsError, TrackingError};
use crate::tracking::landmarks::DetectionFrame;

/// A source of detection frames
pub trait Detector: Send {
    /// Apply changed options; takes effect from the next frame
    fn set_options(&mut self, options: &DetectorOptions);

    /// Produce the next frame, or `None` once the source is exhausted
    fn next_frame(&mut self) -> Option<DetectionFrame>;
}

/// Replays recorded detection frames
pub struct ReplayDetector {
    frames: Vec<DetectionFrame>,
    position: usize,
    looping: bool,
    options: DetectorOptions,
}

impl ReplayDetector {
    /// Load a JSON-lines recording (one detection result object per line)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MidiHandsError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            TrackingError::ReplayRead(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Ok(Self::from_str(&contents)?)
    }

    /// Parse a JSON-lines recording; blank lines are skipped
    pub fn from_str(s: &str) -> Result<Self, TrackingError> {
        let frames = s
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| TrackingError::ReplayParse {
                    line: i + 1,
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<DetectionFrame>, _>>()?;

        Ok(Self::new(frames))
    }

    pub fn new(frames: Vec<DetectionFrame>) -> Self {
        Self {
            frames,
            position: 0,
            looping: false,
            options: DetectorOptions::default(),
        }
    }

    /// Start over from the first frame once the recording ends
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Detector for ReplayDetector {
    fn set_options(&mut self, options: &DetectorOptions) {
        tracing::debug!("Replay detector options: {:?}", options);
        self.options = options.clone();
    }

    fn next_frame(&mut self) -> Option<DetectionFrame> {
        if self.position >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return None;
            }
            self.position = 0;
        }

        let mut frame = self.frames[self.position].clone();
        self.position += 1;

        frame.retain_hands(
            self.options.max_num_hands,
            self.options.min_detection_confidence,
        );
        Some(frame)
    }
}

/// Drive a detector at a fixed frame interval, forwarding its frames.
///
/// Option changes published on `options` are applied before the next frame.
/// Returns when the detector runs dry, the receiver goes away, or shutdown is
/// signalled.
pub async fn run_detector<D: Detector>(
    mut detector: D,
    frame_interval: Duration,
    frames: mpsc::Sender<DetectionFrame>,
    mut options: watch::Receiver<DetectorOptions>,
    mut shutdown: broadcast::Receiver<()>,
) {
    detector.set_options(&options.borrow_and_update());
    let mut ticker = tokio::time::interval(frame_interval.max(Duration::from_millis(1)));
    let mut produced = 0u64;
    let mut options_open = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = options.changed(), if options_open => {
                match changed {
                    Ok(()) => detector.set_options(&options.borrow_and_update()),
                    Err(_) => options_open = false,
                }
                continue;
            }
            _ = shutdown.recv() => {
                tracing::info!("Detector shutting down");
                break;
            }
        }

        let Some(frame) = detector.next_frame() else {
            tracing::info!("Detector finished after {} frames", produced);
            break;
        };
        produced += 1;

        if frames.send(frame).await.is_err() {
            tracing::debug!("Frame receiver closed, stopping detector");
            break;
        }
    }
}
