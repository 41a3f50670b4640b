// AirWave — Capture Window Buffer

use crate::config::CHANNEL_COUNT;
use crate::sample::FeatureVector;

/// Rectangular buffer of `window_size × CHANNEL_COUNT` floats, written one
/// feature vector per slot and drained as a single row-major tensor
/// (sample-major, channel-minor).
#[derive(Debug)]
pub struct CaptureWindow {
    data: Vec<f32>,
    window_size: usize,
    cursor: usize,
}

impl CaptureWindow {
    pub fn new(window_size: usize) -> Self {
        Self {
            data: vec![0.0; window_size * CHANNEL_COUNT],
            window_size,
            cursor: 0,
        }
    }

    /// Write one feature vector into the next slot. Callers must not push
    /// into a full window; the state machine drains before re-arming.
    pub fn push(&mut self, features: &FeatureVector) {
        debug_assert!(self.cursor < self.window_size, "push into a full window");
        let offset = self.cursor * CHANNEL_COUNT;
        self.data[offset..offset + CHANNEL_COUNT].copy_from_slice(features);
        self.cursor += 1;
    }

    pub fn is_full(&self) -> bool {
        self.cursor == self.window_size
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Rearm for the next capture.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Reallocate for a new window size (config change while Idle).
    pub fn resize(&mut self, window_size: usize) {
        self.data = vec![0.0; window_size * CHANNEL_COUNT];
        self.window_size = window_size;
        self.cursor = 0;
    }

    /// The filled window, flattened. Only meaningful when `is_full()`.
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }
}
