// AirWave — Capture & Sensor Configuration

use thiserror::Error;

// ---------------------------------------------------------------------------
// Feature layout
// ---------------------------------------------------------------------------
/// Channels per normalized sample: proximity deviation, gesture, hue,
/// saturation, value.
pub const CHANNEL_COUNT: usize = 5;

// ---------------------------------------------------------------------------
// APDS-9960 native ranges
// ---------------------------------------------------------------------------
pub const PROXIMITY_MIDPOINT: f32 = 127.0;  // raw proximity spans -1–255
pub const PROXIMITY_HALF_RANGE: f32 = 128.0;
pub const COLOR_MAX: f32 = 4097.0;          // per-channel ceiling of readColor()

/// Sliding-window length for the proximity moving average.
pub const PROXIMITY_HISTORY_SIZE: usize = 1000;

// ---------------------------------------------------------------------------
// Capture defaults
// ---------------------------------------------------------------------------
pub const DEFAULT_WINDOW_SIZE: usize = 10;
pub const DEFAULT_CAPTURE_DELAY_MS: u32 = 125;
pub const DEFAULT_ONSET_THRESHOLD: f32 = 0.167;
pub const DEFAULT_CLASS_COUNT: usize = 3;

/// Per-channel onset weights. Only the proximity-deviation channel idles
/// near zero; gesture and HSV sit near -1 between motions, so masking them
/// out keeps the idle amplitude below any sane threshold.
pub const DEFAULT_ONSET_WEIGHTS: [f32; CHANNEL_COUNT] = [1.0, 0.0, 0.0, 0.0, 0.0];

// ---------------------------------------------------------------------------
// Runtime capture configuration
// ---------------------------------------------------------------------------

/// Tunable capture parameters. Updates are staged by the pipeline and only
/// take effect while Idle, never mid-window.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Samples per capture window.
    pub window_size: usize,
    /// Minimum gap between the end of one capture and the start of the next.
    pub capture_delay_ms: u32,
    /// Weighted-amplitude level that arms a new capture.
    pub onset_threshold: f32,
    /// Number of classes the model emits.
    pub class_count: usize,
    /// Per-channel weights for the onset amplitude.
    pub onset_weights: [f32; CHANNEL_COUNT],
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            capture_delay_ms: DEFAULT_CAPTURE_DELAY_MS,
            onset_threshold: DEFAULT_ONSET_THRESHOLD,
            class_count: DEFAULT_CLASS_COUNT,
            onset_weights: DEFAULT_ONSET_WEIGHTS,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("window size must be at least 1")]
    ZeroWindowSize,

    #[error("class count must be at least 1")]
    ZeroClassCount,

    #[error("onset threshold must lie in [0, 1), got {0}")]
    ThresholdOutOfRange(f32),

    #[error("onset weight vector has no nonzero entries")]
    EmptyWeightMask,
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindowSize);
        }
        if self.class_count == 0 {
            return Err(ConfigError::ZeroClassCount);
        }
        // The velocity reduction divides by (1 - threshold).
        if !(0.0..1.0).contains(&self.onset_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.onset_threshold));
        }
        if self.active_weight_count() == 0 {
            return Err(ConfigError::EmptyWeightMask);
        }
        Ok(())
    }

    /// Number of nonzero onset weights — the divisor of the onset amplitude.
    pub fn active_weight_count(&self) -> usize {
        self.onset_weights.iter().filter(|w| **w != 0.0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CaptureConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_window_size_rejected() {
        let cfg = CaptureConfig {
            window_size: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroWindowSize));
    }

    #[test]
    fn all_zero_weights_rejected() {
        let cfg = CaptureConfig {
            onset_weights: [0.0; CHANNEL_COUNT],
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyWeightMask));
    }

    #[test]
    fn threshold_of_one_rejected() {
        let cfg = CaptureConfig {
            onset_threshold: 1.0,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ThresholdOutOfRange(1.0))
        );
    }

    #[test]
    fn active_weight_count_skips_zeros() {
        let cfg = CaptureConfig {
            onset_weights: [0.5, 0.0, 1.0, 0.0, 0.25],
            ..Default::default()
        };
        assert_eq!(cfg.active_weight_count(), 3);
    }
}
