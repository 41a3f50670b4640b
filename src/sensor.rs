// AirWave — Sensor Capability
//
// The pipeline only ever asks "give me this cycle's reading"; what sits
// behind that is a real APDS-9960 driver on device, a recorded trace in
// replay, or the synthetic source below when developing without hardware.

use crate::sample::{Gesture, RawSample};

pub trait SensorSource {
    /// One reading cycle. Channels without fresh data report `None`.
    fn read(&mut self) -> RawSample;
}

// ---------------------------------------------------------------------------
// Scripted source — fixed sample list for tests and replay
// ---------------------------------------------------------------------------

/// Replays a recorded sample list in order; once exhausted, every channel
/// reads as unavailable.
pub struct ScriptedSource {
    samples: Vec<RawSample>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(samples: Vec<RawSample>) -> Self {
        Self { samples, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.samples.len().saturating_sub(self.cursor)
    }
}

impl SensorSource for ScriptedSource {
    fn read(&mut self) -> RawSample {
        match self.samples.get(self.cursor) {
            Some(sample) => {
                self.cursor += 1;
                *sample
            }
            None => RawSample::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Synthetic source — deterministic waves for the demo binary
// ---------------------------------------------------------------------------

const WAVE_PERIOD_CYCLES: u32 = 400;
const WAVE_LENGTH_CYCLES: u32 = 12;

/// Emits a quiet baseline with a short proximity/gesture burst every
/// [`WAVE_PERIOD_CYCLES`] cycles. Deterministic, so two runs of the demo
/// log the same captures.
pub struct SyntheticSensor {
    cycle: u32,
}

impl SyntheticSensor {
    pub fn new() -> Self {
        Self { cycle: 0 }
    }
}

impl Default for SyntheticSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorSource for SyntheticSensor {
    fn read(&mut self) -> RawSample {
        let phase = self.cycle % WAVE_PERIOD_CYCLES;
        self.cycle = self.cycle.wrapping_add(1);

        if phase < WAVE_LENGTH_CYCLES {
            // A hand sweeping past: proximity swings toward the sensor and
            // back, the driver decodes a gesture mid-burst.
            let ramp = if phase < WAVE_LENGTH_CYCLES / 2 {
                phase
            } else {
                WAVE_LENGTH_CYCLES - phase
            };
            let proximity = 127 + (ramp as i32 * 128) / (WAVE_LENGTH_CYCLES as i32 / 2);
            RawSample {
                proximity: Some(proximity.min(255)),
                gesture: (phase == WAVE_LENGTH_CYCLES / 2).then_some(Gesture::Left),
                color: Some([900, 700, 400]),
            }
        } else {
            RawSample {
                proximity: Some(127),
                gesture: None,
                color: if phase % 4 == 0 {
                    Some([800, 800, 800])
                } else {
                    None
                },
            }
        }
    }
}
