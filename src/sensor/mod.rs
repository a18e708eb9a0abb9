//! Sensor ingestion: samples, step fusion, heading, and subscriptions

pub mod fusion;
pub mod heading;
pub mod subscription;
pub mod synthetic;

pub use fusion::StepFusionDetector;
pub use heading::{heading_channel, swipe_heading, HeadingPublisher, HeadingSmoother};
pub use subscription::{SampleSource, SensorSubscription};

use serde::{Deserialize, Serialize};

/// Hardware channel a sample was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorChannel {
    /// Binary step pulse from a dedicated step detector
    StepPulse,
    /// Acceleration with gravity removed (3-axis, m/s²)
    LinearAccel,
    /// Raw accelerometer including gravity (3-axis, m/s²)
    Accel,
    /// Angular velocity (3-axis, rad/s)
    Gyro,
}

impl SensorChannel {
    /// Minimum number of values a sample on this channel must carry
    pub fn min_values(self) -> usize {
        match self {
            SensorChannel::StepPulse => 0,
            SensorChannel::LinearAccel | SensorChannel::Accel | SensorChannel::Gyro => 3,
        }
    }
}

/// Readings with a larger norm are treated as sensor faults (m/s² or rad/s)
pub const MAX_SAMPLE_MAGNITUDE: f32 = 1.0e4;

/// One timestamped reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub channel: SensorChannel,
    values: [f32; 3],
    len: u8,
    /// Monotonic timestamp in nanoseconds
    pub timestamp_ns: u64,
}

impl Sample {
    /// Build a sample from up to three values (extra values are ignored)
    pub fn new(channel: SensorChannel, values: &[f32], timestamp_ns: u64) -> Self {
        let len = values.len().min(3);
        let mut buf = [0.0; 3];
        buf[..len].copy_from_slice(&values[..len]);
        Self {
            channel,
            values: buf,
            len: len as u8,
            timestamp_ns,
        }
    }

    pub fn step_pulse(timestamp_ns: u64) -> Self {
        Self::new(SensorChannel::StepPulse, &[1.0], timestamp_ns)
    }

    pub fn linear_accel(xyz: [f32; 3], timestamp_ns: u64) -> Self {
        Self::new(SensorChannel::LinearAccel, &xyz, timestamp_ns)
    }

    pub fn accel(xyz: [f32; 3], timestamp_ns: u64) -> Self {
        Self::new(SensorChannel::Accel, &xyz, timestamp_ns)
    }

    pub fn gyro(xyz: [f32; 3], timestamp_ns: u64) -> Self {
        Self::new(SensorChannel::Gyro, &xyz, timestamp_ns)
    }

    pub fn values(&self) -> &[f32] {
        &self.values[..self.len as usize]
    }

    /// Enough values for the channel, all finite, and a physically plausible norm
    pub fn is_valid(&self) -> bool {
        self.values().len() >= self.channel.min_values()
            && self.values().iter().all(|v| v.is_finite())
            && self.magnitude() <= MAX_SAMPLE_MAGNITUDE
    }

    /// Euclidean norm of the first three axes
    pub fn magnitude(&self) -> f32 {
        let [x, y, z] = self.values;
        x.hypot(y).hypot(z)
    }
}

/// Which detection path produced a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSource {
    Pulse,
    Motion,
}

/// One detected step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    pub source: StepSource,
    pub timestamp_ns: u64,
}
