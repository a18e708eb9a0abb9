//! Multi-channel step fusion
//!
//! Turns interleaved step-pulse, acceleration, and gyroscope samples into a
//! debounced stream of step events. The step-pulse channel is trusted as-is
//! and only goes through timing checks. Acceleration channels run an adaptive
//! threshold (EWMA of the smoothed-magnitude delta plus 2.2 times its absolute
//! deviation) gated by a peak debounce, the cadence-aware minimum interval, a
//! gyro shake veto, and a two-sample run length. Gyroscope samples only feed
//! the shake veto.
//!
//! All paths share one step clock, so a pulse and an acceleration peak for the
//! same footfall cannot both be emitted.

use tracing::{debug, trace};

use super::{Sample, SensorChannel, StepEvent, StepSource};
use crate::util::time::millis_to_nanos;

/// Low-pass factor for acceleration magnitude
pub const SMOOTHING_ALPHA: f32 = 0.25;
/// Factor for the delta and deviation EWMAs
pub const EWMA_ALPHA: f32 = 0.20;
/// Factor for the inter-step interval EWMA
pub const INTERVAL_ALPHA: f64 = 0.20;
/// Deviation multiplier of the dynamic threshold
pub const DEVIATION_GAIN: f32 = 2.2;
pub const THRESHOLD_FLOOR: f32 = 0.5;
pub const THRESHOLD_CAP: f32 = 2.8;
/// Angular velocity (rad/s) above which motion is treated as shake
pub const SHAKE_THRESHOLD: f32 = 4.0;
pub const PEAK_DEBOUNCE_NS: u64 = millis_to_nanos(180);
/// Absolute floor of the minimum inter-step interval
pub const MIN_STEP_INTERVAL_NS: u64 = millis_to_nanos(220);
pub const INITIAL_INTERVAL_NS: u64 = millis_to_nanos(600);
/// Fraction of the cadence interval a new step must wait
pub const CADENCE_FRACTION: f64 = 0.45;
/// Consecutive qualifying samples needed before a motion step is emitted
pub const MIN_RUN_LENGTH: u32 = 2;
/// Gaps longer than this are treated as a pause, not a slow cadence
pub const MAX_CADENCE_GAP_NS: u64 = millis_to_nanos(2_000);
/// Raw accelerometer is ignored while linear acceleration is this fresh
pub const LINEAR_ACCEL_FRESHNESS_NS: u64 = millis_to_nanos(1_000);

/// Debounce clock shared by every detection path
#[derive(Debug, Clone)]
struct StepClock {
    last_step_ns: Option<u64>,
    ewma_interval_ns: f64,
}

impl StepClock {
    fn new() -> Self {
        Self {
            last_step_ns: None,
            ewma_interval_ns: INITIAL_INTERVAL_NS as f64,
        }
    }

    fn min_interval_ns(&self) -> u64 {
        MIN_STEP_INTERVAL_NS.max((self.ewma_interval_ns * CADENCE_FRACTION) as u64)
    }

    fn ready(&self, now: u64) -> bool {
        match self.last_step_ns {
            None => true,
            Some(last) => now.saturating_sub(last) > self.min_interval_ns(),
        }
    }

    fn accept(&mut self, now: u64) {
        if let Some(last) = self.last_step_ns {
            let observed = now.saturating_sub(last).min(MAX_CADENCE_GAP_NS) as f64;
            self.ewma_interval_ns += INTERVAL_ALPHA * (observed - self.ewma_interval_ns);
        }
        self.last_step_ns = Some(now);
    }
}

/// Adaptive-threshold state for one acceleration channel
#[derive(Debug, Clone, Default)]
struct MotionState {
    primed: bool,
    smoothed_magnitude: f32,
    previous_magnitude: f32,
    ewma_delta: f32,
    ewma_abs_dev: f32,
    consecutive_valid: u32,
    last_threshold: f32,
}

impl MotionState {
    /// Feed one magnitude, returning `(delta, dynamic_threshold)` once primed
    fn update(&mut self, magnitude: f32) -> Option<(f32, f32)> {
        if !self.primed {
            self.primed = true;
            self.smoothed_magnitude = magnitude;
            self.previous_magnitude = magnitude;
            return None;
        }

        self.smoothed_magnitude += SMOOTHING_ALPHA * (magnitude - self.smoothed_magnitude);
        let delta = (self.smoothed_magnitude - self.previous_magnitude).abs();
        self.previous_magnitude = self.smoothed_magnitude;

        self.ewma_delta += EWMA_ALPHA * (delta - self.ewma_delta);
        let abs_dev = (delta - self.ewma_delta).abs();
        self.ewma_abs_dev += EWMA_ALPHA * (abs_dev - self.ewma_abs_dev);

        let threshold = (self.ewma_delta + DEVIATION_GAIN * self.ewma_abs_dev)
            .clamp(THRESHOLD_FLOOR, THRESHOLD_CAP);
        self.last_threshold = threshold;

        Some((delta, threshold))
    }
}

/// How a channel contributes to detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectionPath {
    Pulse,
    Motion { fallback: bool },
    ShakeVeto,
}

impl From<SensorChannel> for DetectionPath {
    fn from(channel: SensorChannel) -> Self {
        match channel {
            SensorChannel::StepPulse => DetectionPath::Pulse,
            SensorChannel::LinearAccel => DetectionPath::Motion { fallback: false },
            SensorChannel::Accel => DetectionPath::Motion { fallback: true },
            SensorChannel::Gyro => DetectionPath::ShakeVeto,
        }
    }
}

/// Per-session step detector. One instance per session, never reset in place.
#[derive(Debug, Clone)]
pub struct StepFusionDetector {
    clock: StepClock,
    last_peak_ns: Option<u64>,
    linear: MotionState,
    raw: MotionState,
    last_linear_ns: Option<u64>,
    last_gyro_magnitude: f32,
    steps_emitted: u64,
}

impl StepFusionDetector {
    pub fn new() -> Self {
        Self {
            clock: StepClock::new(),
            last_peak_ns: None,
            linear: MotionState::default(),
            raw: MotionState::default(),
            last_linear_ns: None,
            last_gyro_magnitude: 0.0,
            steps_emitted: 0,
        }
    }

    /// Process one sample in arrival order. Invalid samples are dropped.
    pub fn process(&mut self, sample: &Sample) -> Option<StepEvent> {
        if !sample.is_valid() {
            trace!(channel = ?sample.channel, "Dropping invalid sample");
            return None;
        }

        let now = sample.timestamp_ns;
        let event = match DetectionPath::from(sample.channel) {
            DetectionPath::Pulse => self.process_pulse(now),
            DetectionPath::Motion { fallback } => self.process_motion(sample, fallback),
            DetectionPath::ShakeVeto => {
                self.last_gyro_magnitude = sample.magnitude();
                None
            }
        };

        if let Some(step) = event {
            self.steps_emitted += 1;
            debug!(
                source = ?step.source,
                timestamp_ns = step.timestamp_ns,
                interval_ns = self.cadence_interval_ns(),
                "Step detected"
            );
        }

        event
    }

    /// Process a batch of samples and return all detected steps
    pub fn process_batch(&mut self, samples: &[Sample]) -> Vec<StepEvent> {
        samples.iter().filter_map(|s| self.process(s)).collect()
    }

    fn process_pulse(&mut self, now: u64) -> Option<StepEvent> {
        if !self.clock.ready(now) {
            return None;
        }
        self.clock.accept(now);
        Some(StepEvent {
            source: StepSource::Pulse,
            timestamp_ns: now,
        })
    }

    fn process_motion(&mut self, sample: &Sample, fallback: bool) -> Option<StepEvent> {
        let now = sample.timestamp_ns;

        if fallback {
            let linear_fresh = self
                .last_linear_ns
                .is_some_and(|t| now.saturating_sub(t) < LINEAR_ACCEL_FRESHNESS_NS);
            if linear_fresh {
                return None;
            }
        } else {
            self.last_linear_ns = Some(now);
        }

        let peak_ready = self
            .last_peak_ns
            .map_or(true, |t| now.saturating_sub(t) > PEAK_DEBOUNCE_NS);
        let clock_ready = self.clock.ready(now);
        let steady = self.last_gyro_magnitude < SHAKE_THRESHOLD;

        let state = if fallback { &mut self.raw } else { &mut self.linear };
        let (delta, threshold) = state.update(sample.magnitude())?;

        let candidate = delta > threshold && peak_ready && clock_ready && steady;
        if !candidate {
            state.consecutive_valid = state.consecutive_valid.saturating_sub(1);
            return None;
        }

        state.consecutive_valid += 1;
        if state.consecutive_valid < MIN_RUN_LENGTH {
            return None;
        }

        state.consecutive_valid = 0;
        self.last_peak_ns = Some(now);
        self.clock.accept(now);
        Some(StepEvent {
            source: StepSource::Motion,
            timestamp_ns: now,
        })
    }

    /// Current EWMA of the inter-step interval
    pub fn cadence_interval_ns(&self) -> u64 {
        self.clock.ewma_interval_ns as u64
    }

    /// Minimum gap the next step must respect
    pub fn min_interval_ns(&self) -> u64 {
        self.clock.min_interval_ns()
    }

    /// Most recent dynamic threshold of the active acceleration channel
    pub fn dynamic_threshold(&self) -> f32 {
        if self.linear.primed {
            self.linear.last_threshold
        } else {
            self.raw.last_threshold
        }
    }

    pub fn steps_emitted(&self) -> u64 {
        self.steps_emitted
    }
}

impl Default for StepFusionDetector {
    fn default() -> Self {
        Self::new()
    }
}
