// AirWave — Trace Replay Tool
//
// Feeds a recorded `proximity,gesture,r,g,b` CSV trace through a fresh
// pipeline and prints every capture it produces. Useful for reproducing a
// field capture offline: replaying the same trace twice yields the same
// results.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

use airwave::classifier::{HeuristicClassifier, LABELS};
use airwave::replay;
use airwave::CaptureConfig;

struct ReplayOptions {
    cycle_ms: u32,
    trace: PathBuf,
}

fn parse_args() -> Result<ReplayOptions> {
    let mut cycle_ms = 10u32;
    let mut trace: Option<PathBuf> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--cycle-ms" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("--cycle-ms needs a value"))?;
                cycle_ms = value.parse()?;
            }
            _ => {
                if trace.is_some() {
                    bail!("usage: replay [--cycle-ms N] <trace.csv>");
                }
                trace = Some(PathBuf::from(arg));
            }
        }
    }

    let trace = trace.ok_or_else(|| anyhow!("usage: replay [--cycle-ms N] <trace.csv>"))?;
    Ok(ReplayOptions { cycle_ms, trace })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let opts = parse_args()?;
    let samples = replay::load_trace(&opts.trace)?;
    println!(
        "replaying {} cycles from {} ({} ms per cycle)",
        samples.len(),
        opts.trace.display(),
        opts.cycle_ms
    );

    let config = CaptureConfig::default();
    let classifier = HeuristicClassifier::new(config.class_count, config.window_size);
    let results = replay::run(&samples, classifier, config, opts.cycle_ms)?;

    for (i, result) in results.iter().enumerate() {
        let label = LABELS
            .get(result.class_index as usize)
            .copied()
            .unwrap_or("?");
        println!(
            "{:>4}. class {} ({}) score {:>3} velocity {:>3}",
            i + 1,
            result.class_index,
            label,
            result.score,
            result.velocity
        );
    }
    println!("{} capture(s)", results.len());

    Ok(())
}
