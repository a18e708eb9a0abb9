//! Snake movement engine: advance, tail trim, growth, collisions

use std::collections::VecDeque;

use rand::distributions::Open01;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{GameState, Point};

/// Buffered step count that triggers a burst
pub const BURST_THRESHOLD: i32 = 2;
/// Sub-advances performed per burst
pub const BURST_SUB_ADVANCES: u32 = 5;
/// Body points spaced this many head radii apart at spawn
pub const SPAWN_SPACING_RADII: f32 = 1.5;
/// Food is eaten within this many head radii
pub const FOOD_REACH_RADII: f32 = 4.0;
/// Growth per food, in head radii of path length
pub const GROWTH_RADII: f32 = 12.0;
/// Body points closer to the head than this index never self-collide
pub const SELF_COLLISION_SKIP: usize = 3;

/// Engine geometry
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub width: f32,
    pub height: f32,
    pub initial_length: usize,
    pub step_pixels: f32,
    pub head_radius: f32,
    pub border_margin: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 500.0,
            height: 500.0,
            initial_length: 10,
            step_pixels: 10.0,
            head_radius: 8.0,
            border_margin: 10.0,
        }
    }
}

/// Authoritative state of one game session
pub struct SnakeEngine {
    config: EngineConfig,
    /// Head first
    body: VecDeque<Point>,
    pending_growth: f32,
    heading_radians: f32,
    food: Option<Point>,
    score: u32,
    game_over: bool,
    step_buffer: i32,
    rng: ChaCha8Rng,
}

impl SnakeEngine {
    /// Create an engine with a reproducible food sequence
    pub fn new(config: EngineConfig, seed: u64) -> Self {
        let spacing = config.head_radius * SPAWN_SPACING_RADII;
        let length = config.initial_length.max(1);
        let span = spacing * (length - 1) as f32;
        let head_x = config.width / 2.0 + span / 2.0;
        let y = config.height / 2.0;

        let body = (0..length)
            .map(|i| Point::new(head_x - i as f32 * spacing, y))
            .collect();

        let mut engine = Self {
            config,
            body,
            pending_growth: 0.0,
            heading_radians: 0.0,
            food: None,
            score: 0,
            game_over: false,
            step_buffer: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        engine.spawn_food();
        engine
    }

    pub fn turn_to_degrees(&mut self, degrees: f32) {
        if degrees.is_finite() {
            self.heading_radians = degrees.to_radians();
        }
    }

    /// Buffer raw step pulses; every time the buffer reaches the threshold
    /// the head moves forward in one burst of sub-advances.
    pub fn on_step_detected(&mut self, count: i32) {
        if self.game_over || count <= 0 {
            return;
        }

        self.step_buffer = self.step_buffer.saturating_add(count);
        if self.step_buffer < BURST_THRESHOLD {
            return;
        }

        self.step_buffer = 0;
        for _ in 0..BURST_SUB_ADVANCES {
            self.advance(self.config.step_pixels);
            self.check_collisions();
            if self.game_over {
                break;
            }
        }
    }

    /// Alias of `on_step_detected`
    pub fn move_forward_by_steps(&mut self, count: i32) {
        self.on_step_detected(count);
    }

    /// Continuous advance independent of steps
    pub fn tick_baseline(&mut self, distance: f32) {
        if self.game_over || !(distance > 0.0) {
            return;
        }
        self.advance(distance);
        self.check_collisions();
    }

    pub fn get_state(&self) -> GameState {
        GameState {
            segments: self.body.iter().copied().collect(),
            food: self.food,
            score: self.score,
            is_game_over: self.game_over,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn pending_growth(&self) -> f32 {
        self.pending_growth
    }

    pub fn heading_radians(&self) -> f32 {
        self.heading_radians
    }

    pub fn head(&self) -> Point {
        self.body[0]
    }

    /// Sum of segment lengths from head to tail
    pub fn path_length(&self) -> f32 {
        self.body
            .iter()
            .zip(self.body.iter().skip(1))
            .map(|(a, b)| a.distance_to(b))
            .sum()
    }

    fn advance(&mut self, distance: f32) {
        let head = self.head();
        let new_head = Point::new(
            head.x + self.heading_radians.cos() * distance,
            head.y + self.heading_radians.sin() * distance,
        );
        self.body.push_front(new_head);

        if distance <= self.pending_growth {
            self.pending_growth -= distance;
            return;
        }

        let trim = distance - self.pending_growth;
        self.pending_growth = 0.0;
        self.trim_tail(trim);
    }

    /// Remove `remaining` path length from the tail end
    fn trim_tail(&mut self, mut remaining: f32) {
        while remaining > 0.0 && self.body.len() > 1 {
            let len = self.body.len();
            let last = self.body[len - 1];
            let before_last = self.body[len - 2];
            let segment = before_last.distance_to(&last);

            if segment <= remaining {
                self.body.pop_back();
                remaining -= segment;
            } else {
                let t = (segment - remaining) / segment;
                self.body[len - 1] = Point::new(
                    before_last.x + (last.x - before_last.x) * t,
                    before_last.y + (last.y - before_last.y) * t,
                );
                remaining = 0.0;
            }
        }
    }

    fn check_collisions(&mut self) {
        let head = self.head();
        let EngineConfig {
            width,
            height,
            head_radius,
            border_margin,
            ..
        } = self.config;

        if head.x < border_margin
            || head.y < border_margin
            || head.x > width - border_margin
            || head.y > height - border_margin
        {
            self.game_over = true;
            return;
        }

        if self
            .body
            .iter()
            .skip(SELF_COLLISION_SKIP)
            .any(|p| head.distance_to(p) < head_radius)
        {
            self.game_over = true;
            return;
        }

        if let Some(food) = self.food {
            if head.distance_to(&food) < head_radius * FOOD_REACH_RADII {
                self.score += 1;
                self.pending_growth += head_radius * GROWTH_RADII;
                self.spawn_food();
            }
        }
    }

    fn spawn_food(&mut self) {
        let inset = self.config.border_margin + 2.0 * self.config.head_radius;
        let x = Self::sample_axis(&mut self.rng, inset, self.config.width - inset);
        let y = Self::sample_axis(&mut self.rng, inset, self.config.height - inset);
        self.food = Some(Point::new(x, y));
    }

    /// Uniform draw strictly inside `(low, high)`
    fn sample_axis(rng: &mut ChaCha8Rng, low: f32, high: f32) -> f32 {
        let unit: f32 = rng.sample(Open01);
        let value = low + (high - low) * unit;
        if value > low && value < high {
            value
        } else {
            (low + high) / 2.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SnakeEngine {
        SnakeEngine::new(EngineConfig::default(), 7)
    }

    /// Engine whose food sits far away in a corner
    fn engine_without_food_nearby() -> SnakeEngine {
        let mut engine = engine();
        engine.food = Some(Point::new(30.0, 470.0));
        engine
    }

    #[test]
    fn spawns_centered_horizontal_body() {
        let engine = engine();
        let state = engine.get_state();

        assert_eq!(state.segments.len(), 10);
        assert_eq!(state.score, 0);
        assert!(!state.is_game_over);
        assert!(state.food.is_some());
        assert_eq!(engine.heading_radians(), 0.0);

        let head = state.segments[0];
        let tail = state.segments[9];
        assert!((head.x + tail.x - 500.0).abs() < 1e-3);
        assert!((head.x - tail.x - 108.0).abs() < 1e-3);
        assert!(state.segments.iter().all(|p| p.y == 250.0));
    }

    #[test]
    fn single_step_is_buffered() {
        let mut engine = engine_without_food_nearby();
        let before = engine.head();
        engine.on_step_detected(1);
        assert_eq!(engine.head(), before);

        engine.on_step_detected(1);
        let after = engine.head();
        assert!((after.x - before.x - 50.0).abs() < 1e-3);
        assert!((after.y - before.y).abs() < 1e-3);
    }

    #[test]
    fn burst_moves_five_step_lengths_along_heading() {
        let mut engine = engine_without_food_nearby();
        engine.turn_to_degrees(90.0);
        let before = engine.head();
        let length = engine.path_length();

        engine.move_forward_by_steps(3);

        let after = engine.head();
        assert!((after.x - before.x).abs() < 1e-3);
        assert!((after.y - before.y - 50.0).abs() < 1e-3);
        assert!((engine.path_length() - length).abs() < 1e-2);

        // Buffer was cleared by the burst
        engine.move_forward_by_steps(1);
        assert_eq!(engine.head(), after);
    }

    #[test]
    fn non_positive_input_is_ignored() {
        let mut engine = engine_without_food_nearby();
        let before = engine.get_state();
        engine.on_step_detected(0);
        engine.on_step_detected(-4);
        engine.tick_baseline(0.0);
        engine.tick_baseline(-3.0);
        engine.tick_baseline(f32::NAN);
        assert_eq!(engine.get_state(), before);
    }

    #[test]
    fn path_length_is_conserved_without_growth() {
        let mut engine = engine_without_food_nearby();
        let length = engine.path_length();
        let headings = [0.0, 30.0, 60.0, 30.0];

        for (i, heading) in headings.iter().cycle().take(12).enumerate() {
            engine.turn_to_degrees(*heading);
            engine.tick_baseline(3.0 + i as f32 * 0.7);
            assert!(!engine.is_game_over());
            assert!((engine.path_length() - length).abs() < 1e-2);
        }
    }

    #[test]
    fn pending_growth_suppresses_trim() {
        let mut engine = engine_without_food_nearby();
        engine.pending_growth = 25.0;
        let length = engine.path_length();

        engine.tick_baseline(10.0);
        assert!((engine.pending_growth() - 15.0).abs() < 1e-4);
        assert!((engine.path_length() - length - 10.0).abs() < 1e-3);

        engine.tick_baseline(20.0);
        assert_eq!(engine.pending_growth(), 0.0);
        assert!((engine.path_length() - length - 25.0).abs() < 1e-3);
    }

    #[test]
    fn eating_food_scores_and_grows() {
        let mut engine = engine();
        let head = engine.head();
        engine.food = Some(Point::new(head.x + 10.0, head.y));

        engine.tick_baseline(1.0);

        assert_eq!(engine.score(), 1);
        assert!((engine.pending_growth() - 96.0).abs() < 1e-4);

        let food = engine.get_state().food.unwrap();
        let low = 10.0 + 16.0;
        let high = 500.0 - low;
        assert!(food.x > low && food.x < high);
        assert!(food.y > low && food.y < high);
    }

    #[test]
    fn food_always_spawns_inside_inset() {
        for seed in 0..200 {
            let engine = SnakeEngine::new(EngineConfig::default(), seed);
            let food = engine.get_state().food.unwrap();
            assert!(food.x > 26.0 && food.x < 474.0);
            assert!(food.y > 26.0 && food.y < 474.0);
        }
    }

    #[test]
    fn axis_samples_exclude_both_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..10_000 {
            let wide = SnakeEngine::sample_axis(&mut rng, 26.0, 474.0);
            assert!(wide > 26.0 && wide < 474.0);
            let narrow = SnakeEngine::sample_axis(&mut rng, 1.0, 1.001);
            assert!(narrow > 1.0 && narrow < 1.001);
        }
    }

    #[test]
    fn shortest_valid_step_survives_a_burst() {
        let config = EngineConfig {
            step_pixels: 3.0,
            ..EngineConfig::default()
        };
        let mut engine = SnakeEngine::new(config, 7);
        engine.food = Some(Point::new(30.0, 470.0));
        engine.on_step_detected(2);
        assert!(!engine.is_game_over());
    }

    #[test]
    fn hitting_the_wall_ends_the_game() {
        let mut engine = engine_without_food_nearby();
        // Head starts at x=304, wall at 490
        engine.tick_baseline(180.0);
        assert!(!engine.is_game_over());
        engine.tick_baseline(10.0);
        assert!(engine.is_game_over());
    }

    #[test]
    fn game_over_is_terminal() {
        let mut engine = engine_without_food_nearby();
        engine.tick_baseline(400.0);
        assert!(engine.is_game_over());

        let frozen = engine.get_state();
        engine.on_step_detected(10);
        engine.tick_baseline(5.0);
        engine.turn_to_degrees(180.0);
        engine.tick_baseline(5.0);

        let state = engine.get_state();
        assert_eq!(state.segments, frozen.segments);
        assert!(state.is_game_over);
    }

    #[test]
    fn turning_back_into_body_collides() {
        let mut engine = engine_without_food_nearby();
        engine.turn_to_degrees(180.0);
        engine.tick_baseline(24.0);
        assert!(engine.is_game_over());
    }

    #[test]
    fn neighbours_within_radius_are_skipped() {
        let mut engine = engine_without_food_nearby();
        engine.tick_baseline(3.0);
        engine.tick_baseline(3.0);

        let state = engine.get_state();
        let head = state.segments[0];
        assert!(head.distance_to(&state.segments[1]) < 8.0);
        assert!(head.distance_to(&state.segments[2]) < 8.0);
        assert!(!state.is_game_over);
    }

    #[test]
    fn square_loop_of_bursts_survives() {
        let mut engine = engine_without_food_nearby();
        for burst in 0..8 {
            engine.turn_to_degrees(90.0 * (burst % 4) as f32);
            engine.on_step_detected(2);
            assert!(!engine.is_game_over(), "collided on burst {burst}");
        }
    }

    #[test]
    fn same_seed_same_food() {
        let a = SnakeEngine::new(EngineConfig::default(), 99).get_state();
        let b = SnakeEngine::new(EngineConfig::default(), 99).get_state();
        assert_eq!(a.food, b.food);
    }
}
