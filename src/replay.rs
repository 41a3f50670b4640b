// AirWave — Batch Replay
//
// Feeds a recorded sample list through a fresh pipeline with synthetic
// timestamps. The per-cycle logic is identical to live operation, so a
// replayed trace reproduces the live capture sequence bit for bit.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;

use crate::capture::{GesturePipeline, PipelineError};
use crate::classifier::Classifier;
use crate::config::CaptureConfig;
use crate::sample::{Gesture, InferenceResult, RawSample};
use crate::sensor::ScriptedSource;

/// Run a recorded trace through a fresh pipeline. Cycle `i` is stamped
/// `i * cycle_ms`, which stands in for the live polling interval.
pub fn run<C: Classifier>(
    samples: &[RawSample],
    classifier: C,
    config: CaptureConfig,
    cycle_ms: u32,
) -> Result<Vec<InferenceResult>, PipelineError> {
    let source = ScriptedSource::new(samples.to_vec());
    let mut pipeline = GesturePipeline::new(source, classifier, config)?;

    let mut results = Vec::new();
    for i in 0..samples.len() as u32 {
        if let Some(result) = pipeline.process_cycle(i.wrapping_mul(cycle_ms))? {
            results.push(result);
        }
    }
    Ok(results)
}

// ---------------------------------------------------------------------------
// Trace CSV parsing
// ---------------------------------------------------------------------------

/// Load a `proximity,gesture,r,g,b` trace. An empty cell means that channel
/// was unavailable that cycle; r, g and b must be empty or present together.
pub fn load_trace(path: impl AsRef<Path>) -> Result<Vec<RawSample>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("cannot open trace {}", path.display()))?;
    parse_trace(file).with_context(|| format!("cannot parse trace {}", path.display()))
}

pub fn parse_trace<R: Read>(reader: R) -> Result<Vec<RawSample>> {
    let mut csv = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let mut samples = Vec::new();
    for (row_idx, record) in csv.records().enumerate() {
        let row = row_idx + 1;
        let record = record.with_context(|| format!("invalid row {row}"))?;
        if record.len() != 5 {
            bail!("row {row} has {} columns, expected 5", record.len());
        }

        let proximity = parse_optional_int(&record[0])
            .with_context(|| format!("bad proximity in row {row}"))?;

        let gesture = match parse_optional_int(&record[1])
            .with_context(|| format!("bad gesture in row {row}"))?
        {
            Some(code) => Some(
                Gesture::from_code(code)
                    .with_context(|| format!("unknown gesture code {code} in row {row}"))?,
            ),
            None => None,
        };

        let rgb: Vec<Option<i32>> = (2..5)
            .map(|i| parse_optional_int(&record[i]))
            .collect::<Result<_>>()
            .with_context(|| format!("bad color in row {row}"))?;
        let color = match (rgb[0], rgb[1], rgb[2]) {
            (Some(r), Some(g), Some(b)) => Some([r, g, b]),
            (None, None, None) => None,
            _ => bail!("row {row} has a partial color reading"),
        };

        samples.push(RawSample {
            proximity,
            gesture,
            color,
        });
    }
    Ok(samples)
}

fn parse_optional_int(cell: &str) -> Result<Option<i32>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    Ok(Some(cell.parse()?))
}
