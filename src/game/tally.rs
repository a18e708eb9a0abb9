//! Step counters for the current session and the scheduler lifetime

/// Energy credited per detected step (kcal)
pub const KCAL_PER_STEP: f64 = 0.04;

#[derive(Debug, Clone, Default)]
pub struct StepTally {
    session_steps: u64,
    total_steps: u64,
}

impl StepTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, steps: u64) {
        self.session_steps += steps;
        self.total_steps += steps;
    }

    pub fn reset_session(&mut self) {
        self.session_steps = 0;
    }

    pub fn reset_total(&mut self) {
        self.session_steps = 0;
        self.total_steps = 0;
    }

    pub fn session_steps(&self) -> u64 {
        self.session_steps
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Calories burned this session
    pub fn calories(&self) -> f64 {
        self.session_steps as f64 * KCAL_PER_STEP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_reset_keeps_lifetime_total() {
        let mut tally = StepTally::new();
        tally.record(25);
        assert!((tally.calories() - 1.0).abs() < 1e-9);

        tally.reset_session();
        tally.record(5);
        assert_eq!(tally.session_steps(), 5);
        assert_eq!(tally.total_steps(), 30);

        tally.reset_total();
        assert_eq!(tally.total_steps(), 0);
        assert_eq!(tally.calories(), 0.0);
    }
}
