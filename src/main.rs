// AirWave — Demo Driver
//
// Wires the synthetic sensor and the heuristic classifier into a pipeline
// and polls it at a fixed interval, logging every capture. This is the
// host-side stand-in for the device loop: on hardware, the sensor trait is
// backed by the real APDS-9960 driver and the classifier by the TFLite
// Micro engine, but the cycle logic is exactly this.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;

use airwave::classifier::{HeuristicClassifier, LABELS};
use airwave::{CaptureConfig, GesturePipeline, SyntheticSensor};

/// Polling interval; roughly the APDS-9960 gesture engine's cycle time.
const CYCLE_INTERVAL_MS: u64 = 10;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("airwave demo starting…");

    let config = CaptureConfig::default();
    let classifier = HeuristicClassifier::new(config.class_count, config.window_size);
    let mut pipeline = GesturePipeline::new(SyntheticSensor::new(), classifier, config)?;

    pipeline.set_callback(|result| {
        let label = LABELS
            .get(result.class_index as usize)
            .copied()
            .unwrap_or("?");
        log::info!(
            "gesture: {} ({:.1}%) velocity {}",
            label,
            result.score as f32 / 255.0 * 100.0,
            result.velocity
        );
    });

    let start = Instant::now();
    let interval = Duration::from_millis(CYCLE_INTERVAL_MS);

    loop {
        let tick_start = Instant::now();

        let now_ms = start.elapsed().as_millis() as u32;
        if let Err(e) = pipeline.process_cycle(now_ms) {
            log::error!("cycle failed: {e}");
        }

        // Sleep for the remainder of the interval to hold the cycle rate.
        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
}
