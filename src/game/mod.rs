//! Game simulation modules

pub mod engine;
pub mod session;
pub mod snapshot;
pub mod tally;

pub use engine::{EngineConfig, SnakeEngine};
pub use session::{ControlMsg, GameSession, SchedulerConfig, SessionError, SessionHandle};
pub use snapshot::SessionSnapshot;
pub use tally::StepTally;

use serde::{Deserialize, Serialize};

/// Position on the canvas plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Snapshot of one engine, produced fresh on every read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Head first
    pub segments: Vec<Point>,
    pub food: Option<Point>,
    pub score: u32,
    pub is_game_over: bool,
}
