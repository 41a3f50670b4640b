// AirWave — Sensor Samples & Pipeline Data Types

use crate::config::CHANNEL_COUNT;

// ---------------------------------------------------------------------------
// Gesture codes (APDS-9960 driver enumeration)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    None = -1,
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Gesture {
    pub const ALL: [Gesture; 5] = [
        Gesture::None,
        Gesture::Up,
        Gesture::Down,
        Gesture::Left,
        Gesture::Right,
    ];

    pub fn ordinal(self) -> i32 {
        self as i32
    }

    /// Map a raw driver code back to a gesture; unknown codes are rejected.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::None),
            0 => Some(Self::Up),
            1 => Some(Self::Down),
            2 => Some(Self::Left),
            3 => Some(Self::Right),
            _ => None,
        }
    }

    /// Human-readable label (kept for debugging/logging purposes).
    #[allow(dead_code)]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl Default for Gesture {
    fn default() -> Self {
        Self::None
    }
}

// ---------------------------------------------------------------------------
// Raw sensor reading (one cycle)
// ---------------------------------------------------------------------------

/// One reading cycle from the sensor. `None` on a channel means the sensor
/// had no fresh data this cycle; the normalizer substitutes per its policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    pub proximity: Option<i32>,
    pub gesture: Option<Gesture>,
    pub color: Option<[i32; 3]>,
}

// ---------------------------------------------------------------------------
// Normalized feature vector
// ---------------------------------------------------------------------------

/// Ordered as {proximity deviation, gesture, hue, saturation, value}, each
/// in [-1, 1] (proximity deviation may briefly exceed that after a
/// transient, since it subtracts a running average).
pub type FeatureVector = [f32; CHANNEL_COUNT];

// ---------------------------------------------------------------------------
// Classification outcome
// ---------------------------------------------------------------------------

/// Result of one completed capture, handed to the reporting callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceResult {
    /// Arg-max class index.
    pub class_index: u8,
    /// Winning score scaled to a byte (1.0 → 255).
    pub score: u8,
    /// Peak motion intensity over the window, scaled to a byte relative to
    /// the onset threshold.
    pub velocity: u8,
}
