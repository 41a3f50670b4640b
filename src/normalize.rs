// AirWave — Sample Normalizer
//
// Converts one raw APDS-9960 reading into a 5-channel feature vector in
// [-1, 1]. The proximity channel reports deviation from its own moving
// average rather than absolute level, so the classifier sees motion, not
// ambient distance. Sensor unavailability is never an error: proximity and
// color persist their last reading, gestures decay to "none".

use crate::config::{
    CHANNEL_COUNT, COLOR_MAX, PROXIMITY_HALF_RANGE, PROXIMITY_HISTORY_SIZE, PROXIMITY_MIDPOINT,
};
use crate::sample::{FeatureVector, Gesture, RawSample};

// ---------------------------------------------------------------------------
// Running history (moving average in O(1) per update)
// ---------------------------------------------------------------------------

/// Fixed-capacity ring of the most recent values plus their running sum.
/// Until the ring fills, the average divides by the number of entries seen,
/// not the capacity.
#[derive(Debug)]
pub struct RunningHistory {
    entries: Vec<f32>,
    sum: f32,
    index: usize,
    len: usize,
}

impl RunningHistory {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be at least 1");
        Self {
            entries: vec![0.0; capacity],
            sum: 0.0,
            index: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, value: f32) {
        self.sum += value;
        self.sum -= self.entries[self.index];
        self.entries[self.index] = value;
        self.index = (self.index + 1) % self.entries.len();
        if self.len < self.entries.len() {
            self.len += 1;
        }
    }

    /// Mean of the currently held entries; 0 when empty.
    pub fn average(&self) -> f32 {
        if self.len == 0 {
            0.0
        } else {
            self.sum / self.len as f32
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

pub struct SampleNormalizer {
    history: RunningHistory,
    last_proximity: i32,
    last_rgb: [i32; 3],
    gesture_median: f32,
    gesture_amplitude: f32,
}

impl SampleNormalizer {
    pub fn new() -> Self {
        Self::with_history_capacity(PROXIMITY_HISTORY_SIZE)
    }

    pub fn with_history_capacity(capacity: usize) -> Self {
        let min = Gesture::ALL.iter().map(|g| g.ordinal()).min().unwrap_or(0);
        let max = Gesture::ALL.iter().map(|g| g.ordinal()).max().unwrap_or(0);
        Self {
            history: RunningHistory::new(capacity),
            // Matches the sensor's "no reading yet" proximity value.
            last_proximity: -1,
            last_rgb: [0, 0, 0],
            gesture_median: (max + min) as f32 / 2.0,
            gesture_amplitude: (max - min) as f32 / 2.0,
        }
    }

    /// Produce the feature vector for one cycle.
    ///
    /// Proximity ordering contract: normalize the raw value, push it into
    /// the history, then emit the delta against the average that already
    /// includes the just-pushed value. Downstream replay depends on this
    /// exact order.
    pub fn normalize(&mut self, sample: &RawSample) -> FeatureVector {
        let mut features = [0.0f32; CHANNEL_COUNT];

        // Proximity: raw range -1–255, kept raw across unavailable cycles so
        // the history update stays independent of earlier normalization.
        let proximity = match sample.proximity {
            Some(raw) => {
                self.last_proximity = raw;
                raw
            }
            None => self.last_proximity,
        };
        let norm_proximity = (proximity as f32 - PROXIMITY_MIDPOINT) / PROXIMITY_HALF_RANGE;
        self.history.push(norm_proximity);
        features[0] = (norm_proximity - self.history.average()) / 2.0;

        // Gesture: momentary event, so an unavailable cycle reads as "none"
        // rather than repeating the previous gesture.
        let gesture = sample.gesture.unwrap_or(Gesture::None);
        features[1] = (gesture.ordinal() as f32 - self.gesture_median) / self.gesture_amplitude;

        // Color: persists like proximity.
        let [r, g, b] = match sample.color {
            Some(rgb) => {
                self.last_rgb = rgb;
                rgb
            }
            None => self.last_rgb,
        };
        let (h, s, v) = rgb_to_hsv(r, g, b);
        features[2] = (h - 0.5) * 2.0;
        features[3] = (s - 0.5) * 2.0;
        features[4] = (v - 0.5) * 2.0;

        features
    }
}

impl Default for SampleNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Six-sector RGB→HSV over the sensor's 0–COLOR_MAX channel range, each
/// output in [0, 1]. A flat color (min == max) pins hue to 0.
fn rgb_to_hsv(r: i32, g: i32, b: i32) -> (f32, f32, f32) {
    let rgb_min = r.min(g).min(b);
    let rgb_max = r.max(g).max(b);
    let diff = (rgb_max - rgb_min) as f32;

    let h = if rgb_min == rgb_max {
        0.0
    } else if r == rgb_max {
        ((g - b) as f32 / diff + 1.0) / 6.0
    } else if g == rgb_max {
        ((b - r) as f32 / diff + 3.0) / 6.0
    } else {
        ((r - g) as f32 / diff + 5.0) / 6.0
    };
    let s = diff / COLOR_MAX;
    let v = rgb_max as f32 / COLOR_MAX;

    (h, s, v)
}
