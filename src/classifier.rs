// AirWave — Inference Capability
//
// The pipeline treats the model as an opaque capability: a fixed-size float
// window in, one score per class out. The real TFLite Micro engine lives
// behind this trait on device; the heuristic backend below lets the whole
// pipeline run end-to-end on a host before a model is linked.

use thiserror::Error;

use crate::config::CHANNEL_COUNT;

/// Labels for the default three-class demo model, in output order.
pub const LABELS: [&str; 3] = ["swipe", "tap", "wave"];

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("invalid window length: expected {expected}, got {actual}")]
    InvalidWindowLength { expected: usize, actual: usize },

    #[error("inference backend failure: {0}")]
    Backend(String),
}

pub trait Classifier {
    /// Length of the score vector `classify` returns.
    fn class_count(&self) -> usize;

    /// Run inference on a flattened capture window
    /// (`window_size × CHANNEL_COUNT` floats, sample-major).
    fn classify(&mut self, window: &[f32]) -> Result<Vec<f32>, ClassifierError>;
}

// ---------------------------------------------------------------------------
// Heuristic back-end — development / testing without a real model
// ---------------------------------------------------------------------------

/// Scores classes from the mean absolute magnitude of the window: low
/// amplitude maps to class 0, high amplitude to the last class. Good enough
/// to exercise the capture path and the reporting boundary.
pub struct HeuristicClassifier {
    class_count: usize,
    expected_len: usize,
}

impl HeuristicClassifier {
    pub fn new(class_count: usize, window_size: usize) -> Self {
        Self {
            class_count,
            expected_len: window_size * CHANNEL_COUNT,
        }
    }
}

impl Classifier for HeuristicClassifier {
    fn class_count(&self) -> usize {
        self.class_count
    }

    fn classify(&mut self, window: &[f32]) -> Result<Vec<f32>, ClassifierError> {
        if window.len() != self.expected_len {
            return Err(ClassifierError::InvalidWindowLength {
                expected: self.expected_len,
                actual: window.len(),
            });
        }

        let mean_abs = window.iter().map(|v| v.abs()).sum::<f32>() / window.len() as f32;

        // Band the magnitude into a winning class; split the remainder
        // evenly across the losers.
        let winner = ((mean_abs * self.class_count as f32) as usize).min(self.class_count - 1);
        let loser_share = if self.class_count > 1 {
            0.15 / (self.class_count - 1) as f32
        } else {
            0.0
        };

        let scores: Vec<f32> = (0..self.class_count)
            .map(|i| if i == winner { 0.85 } else { loser_share })
            .collect();

        log::debug!(
            "heuristic inference — mean |x| = {:.3}, winner = {}",
            mean_abs,
            winner
        );
        Ok(scores)
    }
}
