//! Synthetic walking signal for demos and tests

use std::f32::consts::TAU;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;

use super::{Sample, SampleSource};
use crate::util::time::{millis_to_nanos, monotonic_nanos};

/// Generates a walker's sensor output: a two-sample acceleration spike per
/// footfall on top of a gentle sway, with optional step pulses and gyro.
#[derive(Debug, Clone)]
pub struct SyntheticWalk {
    pub cadence_ms: u64,
    pub sample_period_ms: u64,
    /// Linear acceleration at heel strike (m/s²)
    pub peak_accel: f32,
    pub sway_accel: f32,
    pub with_pulse: bool,
    pub with_gyro: bool,
    /// Angular velocity reported while walking (rad/s)
    pub gyro_rate: f32,
}

impl Default for SyntheticWalk {
    fn default() -> Self {
        Self {
            cadence_ms: 550,
            sample_period_ms: 20,
            peak_accel: 20.0,
            sway_accel: 0.3,
            with_pulse: false,
            with_gyro: true,
            gyro_rate: 0.5,
        }
    }
}

impl SyntheticWalk {
    pub fn with_cadence(cadence_ms: u64) -> Self {
        Self {
            cadence_ms,
            ..Self::default()
        }
    }

    /// Samples for one sampling instant, `elapsed_ns` into the walk
    pub fn samples_at(&self, elapsed_ns: u64, timestamp_ns: u64) -> Vec<Sample> {
        let cadence = millis_to_nanos(self.cadence_ms.max(1));
        let period = millis_to_nanos(self.sample_period_ms.max(1));
        let phase = elapsed_ns % cadence;
        // Footfall lands mid-cycle so the first sample is quiet
        let strike = cadence / 2;
        let in_strike = phase >= strike && phase < strike + 2 * period;

        let cycle = phase as f32 / cadence as f32;
        let sway = self.sway_accel * (cycle * TAU).sin();
        let z = if in_strike { self.peak_accel + sway } else { sway };

        let mut out = Vec::with_capacity(3);
        if self.with_pulse && phase >= strike && phase < strike + period {
            out.push(Sample::step_pulse(timestamp_ns));
        }
        if self.with_gyro {
            out.push(Sample::gyro([self.gyro_rate, 0.0, 0.0], timestamp_ns));
        }
        out.push(Sample::linear_accel([0.0, 0.0, z], timestamp_ns));
        out
    }

    /// Deterministic sample sequence starting at timestamp 0
    pub fn generate(&self, duration_ms: u64) -> Vec<Sample> {
        let period = millis_to_nanos(self.sample_period_ms.max(1));
        let end = millis_to_nanos(duration_ms);
        (0..)
            .map(|k| k * period)
            .take_while(|t| *t < end)
            .flat_map(|t| self.samples_at(t, t))
            .collect()
    }

    /// Footfalls contained in a walk of the given length
    pub fn expected_steps(&self, duration_ms: u64) -> u64 {
        let strike = self.cadence_ms / 2;
        let last_sample = duration_ms.saturating_sub(self.sample_period_ms);
        if last_sample < strike + self.sample_period_ms {
            return 0;
        }
        (last_sample - strike - self.sample_period_ms) / self.cadence_ms + 1
    }
}

impl SampleSource for SyntheticWalk {
    /// Real-time stream paced by the sample period
    fn subscribe(&self) -> BoxStream<'static, Sample> {
        let walk = self.clone();
        let period = Duration::from_millis(walk.sample_period_ms.max(1));
        let start = monotonic_nanos();

        futures::stream::unfold(tokio::time::interval(period), move |mut ticker| {
            let walk = walk.clone();
            async move {
                ticker.tick().await;
                let now = monotonic_nanos();
                Some((walk.samples_at(now.saturating_sub(start), now), ticker))
            }
        })
        .flat_map(futures::stream::iter)
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{StepFusionDetector, StepSource};

    #[test]
    fn detector_counts_every_footfall() {
        let walk = SyntheticWalk::default();
        let samples = walk.generate(10_000);
        let mut detector = StepFusionDetector::new();

        let steps = detector.process_batch(&samples);
        assert_eq!(walk.expected_steps(10_000), 18);
        assert_eq!(steps.len() as u64, walk.expected_steps(10_000));
    }

    #[test]
    fn pulses_claim_footfalls_when_present() {
        let walk = SyntheticWalk {
            with_pulse: true,
            ..SyntheticWalk::default()
        };
        let mut detector = StepFusionDetector::new();

        let steps = detector.process_batch(&walk.generate(5_000));
        assert_eq!(steps.len() as u64, walk.expected_steps(5_000));
        assert!(steps.iter().all(|s| s.source == StepSource::Pulse));
    }

    #[test]
    fn standing_still_yields_nothing() {
        let walk = SyntheticWalk {
            peak_accel: 0.0,
            ..SyntheticWalk::default()
        };
        let mut detector = StepFusionDetector::new();
        assert!(detector.process_batch(&walk.generate(5_000)).is_empty());
    }

    #[tokio::test]
    async fn live_stream_is_timestamped_monotonically() {
        let walk = SyntheticWalk::default();
        let samples: Vec<Sample> = walk.subscribe().take(9).collect().await;

        assert_eq!(samples.len(), 9);
        assert!(samples
            .windows(2)
            .all(|pair| pair[0].timestamp_ns <= pair[1].timestamp_ns));
    }
}
