//! Heading feed: compass smoothing and swipe steering

use tokio::sync::watch;

/// EWMA factor applied to raw azimuth readings
pub const HEADING_SMOOTHING_ALPHA: f32 = 0.12;
/// Drags shorter than this on both axes are ignored
pub const SWIPE_THRESHOLD_PX: f32 = 48.0;

/// Wrap any angle into [0, 360)
pub fn normalize_degrees(degrees: f32) -> f32 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Smooths azimuth readings along the shortest arc
#[derive(Debug, Clone)]
pub struct HeadingSmoother {
    alpha: f32,
    smoothed: Option<f32>,
}

impl HeadingSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            smoothed: None,
        }
    }

    /// Feed one azimuth reading, returns the smoothed heading
    pub fn update(&mut self, azimuth_degrees: f32) -> Option<f32> {
        if !azimuth_degrees.is_finite() {
            return self.smoothed;
        }

        let azimuth = normalize_degrees(azimuth_degrees);
        let next = match self.smoothed {
            None => azimuth,
            Some(prev) => {
                // Signed shortest difference in (-180, 180]
                let mut diff = azimuth - prev;
                if diff > 180.0 {
                    diff -= 360.0;
                } else if diff <= -180.0 {
                    diff += 360.0;
                }
                normalize_degrees(prev + self.alpha * diff)
            }
        };

        self.smoothed = Some(next);
        Some(next)
    }

    pub fn current(&self) -> Option<f32> {
        self.smoothed
    }
}

impl Default for HeadingSmoother {
    fn default() -> Self {
        Self::new(HEADING_SMOOTHING_ALPHA)
    }
}

/// Pushes smoothed headings to the tick scheduler
#[derive(Debug)]
pub struct HeadingPublisher {
    smoother: HeadingSmoother,
    tx: watch::Sender<f32>,
}

impl HeadingPublisher {
    /// Feed a raw compass reading
    pub fn publish_azimuth(&mut self, azimuth_degrees: f32) {
        if let Some(heading) = self.smoother.update(azimuth_degrees) {
            let _ = self.tx.send(heading);
        }
    }

    /// Subscribe another reader to the heading feed
    pub fn subscribe(&self) -> watch::Receiver<f32> {
        self.tx.subscribe()
    }
}

/// Create a heading feed starting at 0°
pub fn heading_channel() -> (HeadingPublisher, watch::Receiver<f32>) {
    let (tx, rx) = watch::channel(0.0);
    let publisher = HeadingPublisher {
        smoother: HeadingSmoother::default(),
        tx,
    };
    (publisher, rx)
}

/// Map a finished drag to one of four headings (screen coordinates, y down)
pub fn swipe_heading(total_dx: f32, total_dy: f32) -> Option<f32> {
    let abs_dx = total_dx.abs();
    let abs_dy = total_dy.abs();
    if !(total_dx.is_finite() && total_dy.is_finite())
        || (abs_dx < SWIPE_THRESHOLD_PX && abs_dy < SWIPE_THRESHOLD_PX)
    {
        return None;
    }

    let heading = if abs_dx > abs_dy {
        if total_dx > 0.0 {
            0.0
        } else {
            180.0
        }
    } else if total_dy > 0.0 {
        90.0
    } else {
        270.0
    };
    Some(heading)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reading_seeds_smoother() {
        let mut smoother = HeadingSmoother::default();
        assert_eq!(smoother.update(-90.0), Some(270.0));
    }

    #[test]
    fn smoothing_takes_the_short_way_round() {
        let mut smoother = HeadingSmoother::default();
        smoother.update(350.0);
        let next = smoother.update(10.0).unwrap();
        // 12% of a +20° turn, wrapping through north
        assert!((next - 352.4).abs() < 1e-3, "got {next}");
    }

    #[test]
    fn non_finite_readings_are_ignored() {
        let mut smoother = HeadingSmoother::default();
        smoother.update(45.0);
        assert_eq!(smoother.update(f32::NAN), Some(45.0));
    }

    #[test]
    fn swipes_pick_dominant_axis() {
        assert_eq!(swipe_heading(100.0, 10.0), Some(0.0));
        assert_eq!(swipe_heading(-100.0, 10.0), Some(180.0));
        assert_eq!(swipe_heading(5.0, 60.0), Some(90.0));
        assert_eq!(swipe_heading(5.0, -60.0), Some(270.0));
        assert_eq!(swipe_heading(20.0, -30.0), None);
    }

    #[test]
    fn publisher_feeds_latest_value() {
        let (mut publisher, rx) = heading_channel();
        assert_eq!(*rx.borrow(), 0.0);
        publisher.publish_azimuth(90.0);
        assert_eq!(*rx.borrow(), 90.0);
    }
}
