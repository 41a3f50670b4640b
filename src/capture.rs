// AirWave — Capture State Machine & Result Reduction
//
// One `step` per sensor cycle. Idle cycles pay for a delay-gate check and
// one weighted-amplitude evaluation; nothing is stored. Once the amplitude
// crosses the threshold the triggering vector becomes window slot 0 and the
// machine fills until the window drains into the classifier.

use thiserror::Error;

use crate::classifier::{Classifier, ClassifierError};
use crate::config::{CaptureConfig, ConfigError, CHANNEL_COUNT};
use crate::normalize::SampleNormalizer;
use crate::sample::{FeatureVector, InferenceResult};
use crate::sensor::SensorSource;
use crate::window::CaptureWindow;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid capture config: {0}")]
    Config(#[from] ConfigError),

    #[error("class count mismatch: config says {expected}, classifier reports {actual}")]
    ClassCountMismatch { expected: usize, actual: usize },

    #[error("classifier returned {actual} scores, expected {expected}")]
    ScoreLengthMismatch { expected: usize, actual: usize },

    #[error("inference failed: {0}")]
    Inference(#[from] ClassifierError),
}

// ---------------------------------------------------------------------------
// Onset detection
// ---------------------------------------------------------------------------

/// Weighted-magnitude gate over one feature vector. Stateless; the state
/// machine re-evaluates it every Idle cycle.
#[derive(Debug, Clone)]
pub struct OnsetFilter {
    weights: [f32; CHANNEL_COUNT],
    active: usize,
}

impl OnsetFilter {
    pub fn new(weights: [f32; CHANNEL_COUNT]) -> Self {
        let active = weights.iter().filter(|w| **w != 0.0).count();
        Self { weights, active }
    }

    /// Mean absolute weighted amplitude across the active channels.
    pub fn amplitude(&self, features: &FeatureVector) -> f32 {
        let sum: f32 = features
            .iter()
            .zip(self.weights.iter())
            .map(|(f, w)| (f * w).abs())
            .sum();
        sum / self.active as f32
    }
}

// ---------------------------------------------------------------------------
// Result reduction
// ---------------------------------------------------------------------------

/// Arg-max over the score vector (strict greater-than, so ties keep the
/// lowest index) plus byte-scaled score and velocity.
///
/// The velocity can go negative when the window's peak magnitude lands
/// below the threshold that triggered it; the saturating float→u8 cast
/// clamps that to 0 (and NaN, and anything above 255).
pub fn reduce_scores(scores: &[f32], peak_velocity: f32, threshold: f32) -> InferenceResult {
    let mut max_index = 0usize;
    let mut max_value = 0.0f32;
    for (i, &value) in scores.iter().enumerate() {
        if value > max_value {
            max_value = value;
            max_index = i;
        }
    }

    // ×255.999 so a perfect 1.0 truncates to 255 instead of overflowing.
    let score = (max_value * 255.999) as u8;
    let velocity = ((peak_velocity - threshold) / (1.0 - threshold) * 255.999) as u8;

    InferenceResult {
        class_index: max_index as u8,
        score,
        velocity,
    }
}

// ---------------------------------------------------------------------------
// Capture engine (the state machine proper)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Waiting for onset; nothing buffered.
    Idle,
    /// A window is being filled.
    Filling,
    /// The full window is being handed to the classifier. Transient within
    /// one `step` call — classification is synchronous.
    Draining,
}

/// The capture state machine, operating on already-normalized feature
/// vectors. Owns the window, the peak-velocity tracker, and the capture
/// timestamps; nothing else mutates them.
pub struct CaptureEngine {
    config: CaptureConfig,
    staged: Option<CaptureConfig>,
    filter: OnsetFilter,
    window: CaptureWindow,
    state: CaptureState,
    peak_velocity: f32,
    last_capture_ms: Option<u32>,
}

impl CaptureEngine {
    pub fn new(config: CaptureConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let filter = OnsetFilter::new(config.onset_weights);
        let window = CaptureWindow::new(config.window_size);
        Ok(Self {
            config,
            staged: None,
            filter,
            window,
            state: CaptureState::Idle,
            peak_velocity: 0.0,
            last_capture_ms: None,
        })
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Stage a config update. Validated now, applied at the start of the
    /// next Idle cycle so a window in flight is never disturbed.
    pub fn update_config(&mut self, config: CaptureConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.staged = Some(config);
        Ok(())
    }

    /// Advance the machine by one cycle. Returns a result only on the cycle
    /// that completes a window.
    pub fn step(
        &mut self,
        now_ms: u32,
        features: &FeatureVector,
        classifier: &mut dyn Classifier,
    ) -> Result<Option<InferenceResult>, PipelineError> {
        if self.state == CaptureState::Idle {
            if let Some(staged) = self.staged.take() {
                self.apply_config(staged);
            }

            // Delay gate first: a gated cycle does no onset work at all.
            if let Some(last) = self.last_capture_ms {
                if now_ms.wrapping_sub(last) < self.config.capture_delay_ms {
                    return Ok(None);
                }
            }

            let amplitude = self.filter.amplitude(features);
            if amplitude < self.config.onset_threshold {
                // Below threshold: the vector served only the onset test.
                return Ok(None);
            }

            log::info!(
                "capture started — onset amplitude {:.3} (threshold {:.3})",
                amplitude,
                self.config.onset_threshold
            );
            self.window.reset();
            self.peak_velocity = 0.0;
            self.state = CaptureState::Filling;
            // Fall through: the triggering vector is window slot 0.
        }

        // Motion intensity over the first three channels, independent of
        // whatever the classifier later decides.
        let velocity = (features[0].abs() + features[1].abs() + features[2].abs()) / 3.0;
        self.peak_velocity = self.peak_velocity.max(velocity);

        log::trace!("slot {} <- {:?}", self.window.cursor(), features);
        self.window.push(features);

        if self.window.is_full() {
            self.state = CaptureState::Draining;
            let outcome = self.drain(classifier);
            // The capture is consumed and the delay gate arms even when the
            // classifier fails, so a persistent backend fault cannot spin
            // the machine into an immediate re-trigger loop.
            self.state = CaptureState::Idle;
            self.last_capture_ms = Some(now_ms);
            return outcome.map(Some);
        }

        Ok(None)
    }

    fn drain(&mut self, classifier: &mut dyn Classifier) -> Result<InferenceResult, PipelineError> {
        let scores = classifier.classify(self.window.as_flat())?;
        if scores.len() != self.config.class_count {
            return Err(PipelineError::ScoreLengthMismatch {
                expected: self.config.class_count,
                actual: scores.len(),
            });
        }

        for (i, score) in scores.iter().enumerate() {
            log::debug!("class {}: {:.6}", i, score);
        }

        let result = reduce_scores(&scores, self.peak_velocity, self.config.onset_threshold);
        log::info!(
            "winner: class {} (score {}, velocity {})",
            result.class_index,
            result.score,
            result.velocity
        );
        Ok(result)
    }

    fn apply_config(&mut self, config: CaptureConfig) {
        if config.window_size != self.config.window_size {
            self.window.resize(config.window_size);
        }
        self.filter = OnsetFilter::new(config.onset_weights);
        self.config = config;
    }
}

// ---------------------------------------------------------------------------
// Pipeline (sensor + normalizer + engine + classifier + callback)
// ---------------------------------------------------------------------------

pub type ResultCallback = Box<dyn FnMut(InferenceResult)>;

/// One complete capture pipeline instance. Everything is owned here, so
/// several independent pipelines can coexist (and tests get clean state
/// for free).
pub struct GesturePipeline<S: SensorSource, C: Classifier> {
    sensor: S,
    classifier: C,
    normalizer: SampleNormalizer,
    engine: CaptureEngine,
    callback: Option<ResultCallback>,
}

impl<S: SensorSource, C: Classifier> core::fmt::Debug for GesturePipeline<S, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GesturePipeline").finish_non_exhaustive()
    }
}

impl<S: SensorSource, C: Classifier> GesturePipeline<S, C> {
    pub fn new(sensor: S, classifier: C, config: CaptureConfig) -> Result<Self, PipelineError> {
        let actual = classifier.class_count();
        if actual != config.class_count {
            return Err(PipelineError::ClassCountMismatch {
                expected: config.class_count,
                actual,
            });
        }
        let engine = CaptureEngine::new(config)?;
        Ok(Self {
            sensor,
            classifier,
            normalizer: SampleNormalizer::new(),
            engine,
            callback: None,
        })
    }

    /// Install the reporting boundary. Fire-and-forget: a result is handed
    /// over once and never retried.
    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(InferenceResult) + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn state(&self) -> CaptureState {
        self.engine.state()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.engine.config
    }

    pub fn update_config(&mut self, config: CaptureConfig) -> Result<(), PipelineError> {
        let actual = self.classifier.class_count();
        if actual != config.class_count {
            return Err(PipelineError::ClassCountMismatch {
                expected: config.class_count,
                actual,
            });
        }
        self.engine.update_config(config)?;
        Ok(())
    }

    /// Run one cycle: read the sensor, normalize, step the state machine,
    /// and deliver any completed result to the callback.
    pub fn process_cycle(&mut self, now_ms: u32) -> Result<Option<InferenceResult>, PipelineError> {
        let raw = self.sensor.read();
        let features = self.normalizer.normalize(&raw);
        let result = self.engine.step(now_ms, &features, &mut self.classifier)?;

        if let Some(result) = result {
            if let Some(callback) = self.callback.as_mut() {
                callback(result);
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{Gesture, RawSample};
    use crate::sensor::ScriptedSource;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Counts classify calls and records the windows it was handed.
    struct MockClassifier {
        scores: Vec<f32>,
        calls: usize,
        windows: Vec<Vec<f32>>,
        fail: bool,
    }

    impl MockClassifier {
        fn returning(scores: Vec<f32>) -> Self {
            Self {
                scores,
                calls: 0,
                windows: Vec::new(),
                fail: false,
            }
        }
    }

    impl Classifier for MockClassifier {
        fn class_count(&self) -> usize {
            self.scores.len()
        }

        fn classify(&mut self, window: &[f32]) -> Result<Vec<f32>, ClassifierError> {
            self.calls += 1;
            self.windows.push(window.to_vec());
            if self.fail {
                return Err(ClassifierError::Backend("mock failure".into()));
            }
            Ok(self.scores.clone())
        }
    }

    fn test_config(window_size: usize) -> CaptureConfig {
        CaptureConfig {
            window_size,
            capture_delay_ms: 100,
            onset_threshold: 0.167,
            class_count: 3,
            ..Default::default()
        }
    }

    fn loud() -> FeatureVector {
        [0.9, 0.0, 0.0, 0.0, 0.0]
    }

    fn quiet() -> FeatureVector {
        [0.01, 0.0, 0.0, 0.0, 0.0]
    }

    #[test]
    fn argmax_tie_breaks_to_first_occurrence() {
        let r = reduce_scores(&[0.5, 0.5, 0.3], 0.5, 0.167);
        assert_eq!(r.class_index, 0);
    }

    #[test]
    fn perfect_score_truncates_to_255() {
        let r = reduce_scores(&[0.0, 1.0], 1.0, 0.167);
        assert_eq!(r.class_index, 1);
        assert_eq!(r.score, 255);
        assert_eq!(r.velocity, 255);
    }

    #[test]
    fn velocity_clamps_to_zero_below_threshold() {
        let r = reduce_scores(&[0.9, 0.1], 0.05, 0.167);
        assert_eq!(r.velocity, 0);
    }

    #[test]
    fn velocity_matches_formula_above_threshold() {
        let peak = 0.9f32;
        let threshold = 0.167f32;
        let r = reduce_scores(&[0.9, 0.1], peak, threshold);
        let expected = ((peak - threshold) / (1.0 - threshold) * 255.999) as u8;
        assert_eq!(r.velocity, expected);
    }

    #[test]
    fn onset_amplitude_divides_by_active_weights() {
        let filter = OnsetFilter::new([1.0, 0.0, 1.0, 0.0, 0.0]);
        let a = filter.amplitude(&[0.4, 9.0, -0.2, 9.0, 9.0]);
        assert!((a - 0.3).abs() < 1e-6);
    }

    #[test]
    fn quiet_cycles_stay_idle() {
        let mut engine = CaptureEngine::new(test_config(3)).unwrap();
        let mut mock = MockClassifier::returning(vec![0.1, 0.2, 0.7]);

        for t in 0..20 {
            let r = engine.step(t * 10, &quiet(), &mut mock).unwrap();
            assert!(r.is_none());
        }
        assert_eq!(engine.state(), CaptureState::Idle);
        assert_eq!(mock.calls, 0);
    }

    #[test]
    fn triggering_vector_becomes_slot_zero() {
        let mut engine = CaptureEngine::new(test_config(2)).unwrap();
        let mut mock = MockClassifier::returning(vec![0.1, 0.2, 0.7]);

        engine.step(0, &loud(), &mut mock).unwrap();
        assert_eq!(engine.state(), CaptureState::Filling);

        let result = engine.step(10, &quiet(), &mut mock).unwrap();
        assert!(result.is_some());
        assert_eq!(mock.calls, 1);

        let window = &mock.windows[0];
        assert_eq!(window.len(), 2 * CHANNEL_COUNT);
        assert_eq!(&window[..CHANNEL_COUNT], &loud());
        assert_eq!(&window[CHANNEL_COUNT..], &quiet());
    }

    #[test]
    fn exactly_window_size_cycles_produce_one_result() {
        let window_size = 5;
        let mut engine = CaptureEngine::new(test_config(window_size)).unwrap();
        let mut mock = MockClassifier::returning(vec![0.1, 0.8, 0.1]);

        let mut results = 0;
        for t in 0..window_size as u32 {
            // One loud trigger cycle, then quiet fill cycles.
            let f = if t == 0 { loud() } else { quiet() };
            if engine.step(t, &f, &mut mock).unwrap().is_some() {
                results += 1;
            }
        }
        assert_eq!(results, 1);
        assert_eq!(mock.calls, 1);
        assert_eq!(engine.state(), CaptureState::Idle);
    }

    #[test]
    fn delay_gate_blocks_new_capture_after_completion() {
        let mut engine = CaptureEngine::new(test_config(1)).unwrap();
        let mut mock = MockClassifier::returning(vec![0.1, 0.2, 0.7]);

        // Single-slot window: trigger and drain in one cycle at t=1000.
        let r = engine.step(1000, &loud(), &mut mock).unwrap();
        assert!(r.is_some());

        // Loud cycles inside the 100 ms gate do nothing.
        for t in [1001, 1050, 1099] {
            let r = engine.step(t, &loud(), &mut mock).unwrap();
            assert!(r.is_none(), "capture started at t={} inside the gate", t);
        }
        assert_eq!(mock.calls, 1);

        // Gate expires at exactly capture_delay_ms.
        let r = engine.step(1100, &loud(), &mut mock).unwrap();
        assert!(r.is_some());
        assert_eq!(mock.calls, 2);
    }

    #[test]
    fn gate_is_open_before_the_first_capture() {
        let mut engine = CaptureEngine::new(test_config(1)).unwrap();
        let mut mock = MockClassifier::returning(vec![0.1, 0.2, 0.7]);

        // now_ms near zero must not be throttled by an imaginary capture
        // at t=0.
        let r = engine.step(3, &loud(), &mut mock).unwrap();
        assert!(r.is_some());
    }

    #[test]
    fn velocity_reflects_window_peak() {
        let mut engine = CaptureEngine::new(test_config(3)).unwrap();
        let mut mock = MockClassifier::returning(vec![0.1, 0.2, 0.7]);

        engine.step(0, &[0.4, 0.0, 0.0, 0.0, 0.0], &mut mock).unwrap();
        engine.step(1, &[0.9, 0.9, 0.9, 0.0, 0.0], &mut mock).unwrap();
        let r = engine
            .step(2, &[0.1, 0.0, 0.0, 0.0, 0.0], &mut mock)
            .unwrap()
            .unwrap();

        // Peak is the middle cycle: mean |first three| = 0.9.
        let expected = ((0.9 - 0.167) / (1.0 - 0.167) * 255.999) as u8;
        assert_eq!(r.velocity, expected);
    }

    #[test]
    fn classifier_failure_propagates_but_consumes_the_capture() {
        let mut engine = CaptureEngine::new(test_config(1)).unwrap();
        let mut mock = MockClassifier::returning(vec![0.1, 0.2, 0.7]);
        mock.fail = true;

        let err = engine.step(500, &loud(), &mut mock).unwrap_err();
        assert!(matches!(err, PipelineError::Inference(_)));
        assert_eq!(engine.state(), CaptureState::Idle);

        // The failed capture still armed the delay gate.
        mock.fail = false;
        let r = engine.step(510, &loud(), &mut mock).unwrap();
        assert!(r.is_none());
        let r = engine.step(600, &loud(), &mut mock).unwrap();
        assert!(r.is_some());
    }

    #[test]
    fn wrong_score_length_is_rejected() {
        let mut engine = CaptureEngine::new(test_config(1)).unwrap();
        // Two scores against a three-class config.
        let mut mock = MockClassifier::returning(vec![0.4, 0.6]);

        let err = engine.step(0, &loud(), &mut mock).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ScoreLengthMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn config_update_waits_for_idle() {
        let mut engine = CaptureEngine::new(test_config(3)).unwrap();
        let mut mock = MockClassifier::returning(vec![0.1, 0.2, 0.7]);

        engine.step(0, &loud(), &mut mock).unwrap();
        assert_eq!(engine.state(), CaptureState::Filling);

        // Shrinking the window mid-capture must not cut this one short.
        let smaller = CaptureConfig {
            window_size: 1,
            ..test_config(3)
        };
        engine.update_config(smaller).unwrap();
        assert_eq!(engine.config().window_size, 3);

        engine.step(1, &quiet(), &mut mock).unwrap();
        let r = engine.step(2, &quiet(), &mut mock).unwrap();
        assert!(r.is_some());
        assert_eq!(mock.windows[0].len(), 3 * CHANNEL_COUNT);

        // Next capture uses the staged size.
        let r = engine.step(200, &loud(), &mut mock).unwrap();
        assert!(r.is_some());
        assert_eq!(engine.config().window_size, 1);
        assert_eq!(mock.windows[1].len(), CHANNEL_COUNT);
    }

    #[test]
    fn pipeline_rejects_class_count_mismatch_at_construction() {
        let sensor = ScriptedSource::new(Vec::new());
        let classifier = MockClassifier::returning(vec![0.5, 0.5]); // 2 classes
        let err = GesturePipeline::new(sensor, classifier, test_config(2)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ClassCountMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    // End-to-end: scripted proximity spike triggers exactly one capture and
    // one classify call, and the velocity comes from the captured window.
    #[test]
    fn scripted_spike_produces_one_result() {
        let window_size = 4;
        let baseline = RawSample {
            proximity: Some(127),
            ..Default::default()
        };
        let spike = RawSample {
            proximity: Some(255),
            ..Default::default()
        };

        let mut samples = vec![baseline; 6];
        samples.push(spike);
        samples.extend(vec![baseline; window_size - 1]);
        samples.extend(vec![baseline; 5]);

        let config = CaptureConfig {
            window_size,
            capture_delay_ms: 125,
            ..Default::default()
        };
        let mut pipeline = GesturePipeline::new(
            ScriptedSource::new(samples.clone()),
            MockClassifier::returning(vec![0.2, 0.7, 0.1]),
            config,
        )
        .unwrap();

        let delivered = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&delivered);
        pipeline.set_callback(move |r| sink.borrow_mut().push(r));

        let mut returned = Vec::new();
        for i in 0..samples.len() as u32 {
            if let Some(r) = pipeline.process_cycle(i * 10).unwrap() {
                returned.push(r);
            }
        }

        assert_eq!(returned.len(), 1);
        assert_eq!(delivered.borrow().len(), 1);
        assert_eq!(returned[0].class_index, 1);
        assert!(returned[0].velocity > 0);
        assert_eq!(returned[0], delivered.borrow()[0]);
    }

    #[test]
    fn gesture_only_cycle_does_not_trigger_with_default_weights() {
        // Default weights mask everything but proximity deviation; a gesture
        // event alone must not arm a capture.
        let samples = vec![
            RawSample {
                proximity: Some(127),
                gesture: Some(Gesture::Left),
                ..Default::default()
            };
            10
        ];
        let mut pipeline = GesturePipeline::new(
            ScriptedSource::new(samples),
            MockClassifier::returning(vec![0.2, 0.7, 0.1]),
            CaptureConfig::default(),
        )
        .unwrap();

        for i in 0..10 {
            assert!(pipeline.process_cycle(i * 10).unwrap().is_none());
        }
        assert_eq!(pipeline.state(), CaptureState::Idle);
    }
}
