//! Configuration module - environment variable parsing

use std::env;
use std::str::FromStr;

use crate::game::engine::{EngineConfig, SELF_COLLISION_SKIP};
use crate::game::session::SchedulerConfig;
use crate::util::time::{DEFAULT_TICK_RATE_HZ, MAX_TICK_RATE_HZ};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Canvas width in pixels
    pub canvas_width: f32,
    /// Canvas height in pixels
    pub canvas_height: f32,
    /// Distance of one burst sub-advance
    pub step_pixels: f32,
    /// Collision radius of the head
    pub head_radius: f32,
    /// Number of body points at session start
    pub initial_length: usize,
    /// Inset from the canvas edge that counts as wall
    pub border_margin: f32,

    /// Continuous advance per tick (0 = step-driven only)
    pub baseline_speed: f32,
    /// Scheduler tick rate
    pub tick_rate_hz: u32,
    /// Capacity of the step event queue
    pub step_queue_capacity: usize,
    /// Upper bound of step events applied per tick
    pub max_steps_per_tick: usize,
    /// Fixed food seed (random per session when unset)
    pub game_seed: Option<u64>,

    /// Print snapshots as JSON lines
    pub snapshot_json: bool,
    /// Cadence of the synthetic walker used by the demo binary
    pub demo_cadence_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            canvas_width: 1080.0,
            canvas_height: 1920.0,
            step_pixels: 35.0,
            head_radius: 8.0,
            initial_length: 10,
            border_margin: 10.0,
            baseline_speed: 0.0,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            step_queue_capacity: 256,
            max_steps_per_tick: 64,
            game_seed: None,
            snapshot_json: false,
            demo_cadence_ms: 550,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: parse_or("LOG_JSON", defaults.log_json)?,
            canvas_width: parse_or("CANVAS_WIDTH", defaults.canvas_width)?,
            canvas_height: parse_or("CANVAS_HEIGHT", defaults.canvas_height)?,
            step_pixels: parse_or("STEP_PIXELS", defaults.step_pixels)?,
            head_radius: parse_or("HEAD_RADIUS", defaults.head_radius)?,
            initial_length: parse_or("INITIAL_LENGTH", defaults.initial_length)?,
            border_margin: parse_or("BORDER_MARGIN", defaults.border_margin)?,
            baseline_speed: parse_or("BASELINE_SPEED", defaults.baseline_speed)?,
            tick_rate_hz: parse_or("TICK_RATE_HZ", defaults.tick_rate_hz)?,
            step_queue_capacity: parse_or("STEP_QUEUE_CAPACITY", defaults.step_queue_capacity)?,
            max_steps_per_tick: parse_or("MAX_STEPS_PER_TICK", defaults.max_steps_per_tick)?,
            game_seed: match env::var("GAME_SEED") {
                Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid("GAME_SEED"))?),
                Err(_) => None,
            },
            snapshot_json: parse_or("SNAPSHOT_JSON", defaults.snapshot_json)?,
            demo_cadence_ms: parse_or("DEMO_CADENCE_MS", defaults.demo_cadence_ms)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine and scheduler cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.canvas_width > 0.0) {
            return Err(ConfigError::Invalid("CANVAS_WIDTH"));
        }
        if !(self.canvas_height > 0.0) {
            return Err(ConfigError::Invalid("CANVAS_HEIGHT"));
        }
        if !(self.head_radius > 0.0) {
            return Err(ConfigError::Invalid("HEAD_RADIUS"));
        }
        // Shorter advances would put body point 3 inside the head radius
        let min_advance = self.head_radius / SELF_COLLISION_SKIP as f32;
        if !(self.step_pixels >= min_advance) {
            return Err(ConfigError::Invalid("STEP_PIXELS"));
        }
        if self.initial_length == 0 {
            return Err(ConfigError::Invalid("INITIAL_LENGTH"));
        }
        if !(self.border_margin >= 0.0) {
            return Err(ConfigError::Invalid("BORDER_MARGIN"));
        }
        if !(self.baseline_speed >= 0.0)
            || (self.baseline_speed > 0.0 && self.baseline_speed < min_advance)
        {
            return Err(ConfigError::Invalid("BASELINE_SPEED"));
        }
        if self.tick_rate_hz == 0 || self.tick_rate_hz > MAX_TICK_RATE_HZ {
            return Err(ConfigError::Invalid("TICK_RATE_HZ"));
        }
        if self.step_queue_capacity == 0 {
            return Err(ConfigError::Invalid("STEP_QUEUE_CAPACITY"));
        }
        if self.max_steps_per_tick == 0 {
            return Err(ConfigError::Invalid("MAX_STEPS_PER_TICK"));
        }

        // Food must have somewhere to spawn
        let inset = self.border_margin + 2.0 * self.head_radius;
        if self.canvas_width - inset <= inset || self.canvas_height - inset <= inset {
            return Err(ConfigError::CanvasTooSmall);
        }

        Ok(())
    }

    /// Engine geometry for new sessions
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            width: self.canvas_width,
            height: self.canvas_height,
            initial_length: self.initial_length,
            step_pixels: self.step_pixels,
            head_radius: self.head_radius,
            border_margin: self.border_margin,
        }
    }

    /// Tick loop settings
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            tick_rate_hz: self.tick_rate_hz,
            baseline_speed: self.baseline_speed,
            step_queue_capacity: self.step_queue_capacity,
            max_steps_per_tick: self.max_steps_per_tick,
            seed: self.game_seed,
        }
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Canvas is too small to place food inside the border")]
    CanvasTooSmall,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_rate_hz, 60);
        assert_eq!(config.engine().initial_length, 10);
        assert!(!config.log_json);
    }

    #[test]
    fn rejects_non_positive_geometry() {
        let config = Config {
            head_radius: 0.0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid("HEAD_RADIUS"))));

        let config = Config {
            canvas_width: f32::NAN,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid("CANVAS_WIDTH"))));
    }

    #[test]
    fn rejects_canvas_without_spawn_room() {
        let config = Config {
            canvas_width: 40.0,
            canvas_height: 40.0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::CanvasTooSmall)));
    }

    #[test]
    fn rejects_crawling_baseline() {
        let config = Config {
            baseline_speed: 1.0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid("BASELINE_SPEED"))));

        let config = Config {
            baseline_speed: 3.0,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_steps_shorter_than_collision_skip() {
        let config = Config {
            step_pixels: 2.0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid("STEP_PIXELS"))));

        let config = Config {
            step_pixels: 3.0,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_tick_rates_without_a_period() {
        for rate in [0, MAX_TICK_RATE_HZ + 1, 2_000_000] {
            let config = Config {
                tick_rate_hz: rate,
                ..Config::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::Invalid("TICK_RATE_HZ"))));
        }

        let config = Config {
            tick_rate_hz: MAX_TICK_RATE_HZ,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn scheduler_config_carries_seed() {
        let config = Config {
            game_seed: Some(42),
            ..Config::default()
        };
        assert_eq!(config.scheduler().seed, Some(42));
    }
}
