//! Snapshot building for renderers

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{GameState, StepTally};

/// What the scheduler publishes every tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    /// Ticks since the session started
    pub tick: u64,
    pub state: GameState,
    pub paused: bool,
    pub session_steps: u64,
    pub total_steps: u64,
    pub calories: f64,
}

/// Numbers snapshots for one session
pub struct SnapshotBuilder {
    session_id: Uuid,
    tick: u64,
    stats: SnapshotStats,
}

impl SnapshotBuilder {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            tick: 0,
            stats: SnapshotStats::default(),
        }
    }

    /// Build the snapshot for the current tick
    pub fn build(&mut self, state: GameState, paused: bool, tally: &StepTally) -> SessionSnapshot {
        self.tick += 1;
        self.stats.record(state.segments.len());

        SessionSnapshot {
            session_id: self.session_id,
            tick: self.tick,
            state,
            paused,
            session_steps: tally.session_steps(),
            total_steps: tally.total_steps(),
            calories: tally.calories(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }
}

/// Snapshot stats for debugging
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub avg_segments_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, segment_count: usize) {
        self.total_snapshots += 1;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_segments_per_snapshot =
            self.avg_segments_per_snapshot * ((n - 1.0) / n) + (segment_count as f32 / n);
    }
}
