// AirWave — Gesture Capture & Classification Pipeline
//
// Cycle-driven: a single driver repeatedly calls
// `GesturePipeline::process_cycle(now_ms)`. Each cycle reads the sensor,
// normalizes the sample, and steps the capture state machine; when a
// threshold-triggered window fills, it is classified and the result is
// delivered to the reporting callback.

pub mod capture;
pub mod classifier;
pub mod config;
pub mod normalize;
pub mod replay;
pub mod sample;
pub mod sensor;
pub mod window;

pub use capture::{CaptureEngine, CaptureState, GesturePipeline, OnsetFilter, PipelineError};
pub use classifier::{Classifier, ClassifierError, HeuristicClassifier};
pub use config::{CaptureConfig, ConfigError, CHANNEL_COUNT};
pub use normalize::{RunningHistory, SampleNormalizer};
pub use sample::{FeatureVector, Gesture, InferenceResult, RawSample};
pub use sensor::{ScriptedSource, SensorSource, SyntheticSensor};
pub use window::CaptureWindow;
