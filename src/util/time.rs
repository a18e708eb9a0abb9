//! Time utilities for the sensor pipeline and tick loop

use std::time::{Duration, Instant};

/// Default tick rate for the scheduler
pub const DEFAULT_TICK_RATE_HZ: u32 = 60; // ~16ms period

/// Fastest tick rate the scheduler accepts
pub const MAX_TICK_RATE_HZ: u32 = 1_000;

pub const NANOS_PER_MILLI: u64 = 1_000_000;

/// Process start time, the zero point for monotonic sample timestamps
static CLOCK_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the monotonic clock (call once at startup)
pub fn init_clock() {
    CLOCK_START.get_or_init(Instant::now);
}

/// Nanoseconds elapsed since `init_clock` (initializes lazily)
pub fn monotonic_nanos() -> u64 {
    CLOCK_START.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Uptime in seconds
pub fn uptime_secs() -> u64 {
    CLOCK_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Convert milliseconds to nanoseconds
pub const fn millis_to_nanos(ms: u64) -> u64 {
    ms * NANOS_PER_MILLI
}

/// Tick period for the given rate, never shorter than 1µs
pub fn tick_period(rate_hz: u32) -> Duration {
    Duration::from_micros((1_000_000 / rate_hz.max(1) as u64).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_hertz_is_about_sixteen_millis() {
        assert_eq!(tick_period(DEFAULT_TICK_RATE_HZ), Duration::from_micros(16_666));
    }

    #[test]
    fn zero_rate_does_not_divide_by_zero() {
        assert_eq!(tick_period(0), Duration::from_secs(1));
    }

    #[test]
    fn extreme_rate_keeps_non_zero_period() {
        assert_eq!(tick_period(2_000_000), Duration::from_micros(1));
        assert_eq!(tick_period(u32::MAX), Duration::from_micros(1));
        assert_eq!(tick_period(MAX_TICK_RATE_HZ), Duration::from_millis(1));
    }

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        init_clock();
        let a = monotonic_nanos();
        let b = monotonic_nanos();
        assert!(b >= a);
        assert_eq!(millis_to_nanos(180), 180_000_000);
    }
}
