//! Session state and the fixed-rate tick loop

use std::sync::Arc;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::sensor::heading::normalize_degrees;
use crate::sensor::{SampleSource, SensorSubscription, StepEvent};
use crate::util::time::{tick_period, DEFAULT_TICK_RATE_HZ};

use super::snapshot::{SessionSnapshot, SnapshotBuilder};
use super::{EngineConfig, SnakeEngine, StepTally};

/// Tick loop settings
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick_rate_hz: u32,
    /// Continuous advance per tick (0 = step-driven only)
    pub baseline_speed: f32,
    pub step_queue_capacity: usize,
    pub max_steps_per_tick: usize,
    /// Food seed for every session (random per session when unset)
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            baseline_speed: 0.0,
            step_queue_capacity: 256,
            max_steps_per_tick: 64,
            seed: None,
        }
    }
}

/// Commands accepted by the scheduler
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMsg {
    /// Begin a session if none is active
    Start,
    /// Replace the current session with a fresh one
    Restart,
    /// End the current session without starting another
    Stop,
    Pause,
    Resume,
    TogglePause,
    /// Steering override in degrees, wins over the heading feed
    SteerTo(f32),
    ClearSteering,
    /// Apply steps directly, bypassing the sensors
    SimulateSteps(i32),
    /// Canvas size for the next session
    Resize { width: f32, height: f32 },
    Shutdown,
}

/// Session control errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session scheduler is no longer running")]
    Closed,
}

/// Handle to a running scheduler
#[derive(Clone)]
pub struct SessionHandle {
    control_tx: mpsc::Sender<ControlMsg>,
    snapshot_tx: broadcast::Sender<SessionSnapshot>,
    step_tx: broadcast::Sender<StepEvent>,
}

impl SessionHandle {
    pub async fn send(&self, msg: ControlMsg) -> Result<(), SessionError> {
        self.control_tx
            .send(msg)
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub async fn start(&self) -> Result<(), SessionError> {
        self.send(ControlMsg::Start).await
    }

    pub async fn restart(&self) -> Result<(), SessionError> {
        self.send(ControlMsg::Restart).await
    }

    pub async fn stop(&self) -> Result<(), SessionError> {
        self.send(ControlMsg::Stop).await
    }

    pub async fn pause(&self) -> Result<(), SessionError> {
        self.send(ControlMsg::Pause).await
    }

    pub async fn resume(&self) -> Result<(), SessionError> {
        self.send(ControlMsg::Resume).await
    }

    pub async fn toggle_pause(&self) -> Result<(), SessionError> {
        self.send(ControlMsg::TogglePause).await
    }

    pub async fn steer_to(&self, degrees: f32) -> Result<(), SessionError> {
        self.send(ControlMsg::SteerTo(degrees)).await
    }

    pub async fn clear_steering(&self) -> Result<(), SessionError> {
        self.send(ControlMsg::ClearSteering).await
    }

    pub async fn simulate_steps(&self, steps: i32) -> Result<(), SessionError> {
        self.send(ControlMsg::SimulateSteps(steps)).await
    }

    pub async fn resize(&self, width: f32, height: f32) -> Result<(), SessionError> {
        self.send(ControlMsg::Resize { width, height }).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(ControlMsg::Shutdown).await
    }

    /// Snapshots published once per tick
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Every step the scheduler drains from the sensors
    pub fn subscribe_steps(&self) -> broadcast::Receiver<StepEvent> {
        self.step_tx.subscribe()
    }
}

/// Everything owned by one game session; dropped as a unit
struct ActiveSession {
    id: Uuid,
    engine: SnakeEngine,
    step_rx: mpsc::Receiver<StepEvent>,
    /// Aborts the sensor pump (and its detector) on drop
    _subscription: SensorSubscription,
    snapshots: SnapshotBuilder,
    /// Simulated steps waiting for the next tick
    simulated_steps: i32,
    paused: bool,
    game_over: bool,
}

impl ActiveSession {
    fn frozen(&self) -> bool {
        self.paused || self.game_over
    }
}

/// The tick scheduler: owns the active session and drives it at a fixed rate
pub struct GameSession {
    config: SchedulerConfig,
    engine_config: EngineConfig,
    source: Arc<dyn SampleSource>,
    heading_rx: watch::Receiver<f32>,
    steering_override: Option<f32>,
    control_rx: mpsc::Receiver<ControlMsg>,
    snapshot_tx: broadcast::Sender<SessionSnapshot>,
    step_tx: broadcast::Sender<StepEvent>,
    tally: StepTally,
    active: Option<ActiveSession>,
    running: bool,
}

impl GameSession {
    pub fn new(
        config: SchedulerConfig,
        engine_config: EngineConfig,
        source: Arc<dyn SampleSource>,
        heading_rx: watch::Receiver<f32>,
    ) -> (Self, SessionHandle) {
        let (control_tx, control_rx) = mpsc::channel(64);
        let (snapshot_tx, _) = broadcast::channel(64);
        let (step_tx, _) = broadcast::channel(256);

        let handle = SessionHandle {
            control_tx,
            snapshot_tx: snapshot_tx.clone(),
            step_tx: step_tx.clone(),
        };

        let session = Self {
            config,
            engine_config,
            source,
            heading_rx,
            steering_override: None,
            control_rx,
            snapshot_tx,
            step_tx,
            tally: StepTally::new(),
            active: None,
            running: true,
        };

        (session, handle)
    }

    /// Run the tick loop until shutdown or every handle is dropped
    pub async fn run(mut self) {
        info!(tick_rate_hz = self.config.tick_rate_hz, "Scheduler started");

        let mut ticker = interval(tick_period(self.config.tick_rate_hz));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            self.process_controls();
            if !self.running {
                break;
            }

            self.run_tick();
        }

        self.end_session("shutdown");
        info!(total_steps = self.tally.total_steps(), "Scheduler stopped");
    }

    /// Drain all pending control messages
    fn process_controls(&mut self) {
        loop {
            match self.control_rx.try_recv() {
                Ok(msg) => self.handle_control(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running = false;
                    break;
                }
            }
        }
    }

    fn handle_control(&mut self, msg: ControlMsg) {
        debug!(?msg, "Control message");

        match msg {
            ControlMsg::Start => {
                if self.active.is_none() {
                    self.begin_session();
                }
            }
            ControlMsg::Restart => {
                self.end_session("restart");
                self.begin_session();
            }
            ControlMsg::Stop => self.end_session("stop"),
            ControlMsg::Pause => self.set_paused(true),
            ControlMsg::Resume => self.set_paused(false),
            ControlMsg::TogglePause => {
                let paused = self.active.as_ref().is_some_and(|s| s.paused);
                self.set_paused(!paused);
            }
            ControlMsg::SteerTo(degrees) => {
                if degrees.is_finite() {
                    self.steering_override = Some(normalize_degrees(degrees));
                } else {
                    warn!(degrees, "Ignoring non-finite steering heading");
                }
            }
            ControlMsg::ClearSteering => self.steering_override = None,
            ControlMsg::SimulateSteps(steps) => {
                if let Some(session) = self.active.as_mut() {
                    if !session.frozen() && steps > 0 {
                        session.simulated_steps = session.simulated_steps.saturating_add(steps);
                    }
                }
            }
            ControlMsg::Resize { width, height } => {
                if width > 0.0 && height > 0.0 {
                    self.engine_config.width = width;
                    self.engine_config.height = height;
                } else {
                    warn!(width, height, "Ignoring invalid canvas size");
                }
            }
            ControlMsg::Shutdown => self.running = false,
        }
    }

    fn set_paused(&mut self, paused: bool) {
        if let Some(session) = self.active.as_mut() {
            // Game over stays paused until restart
            session.paused = paused || session.game_over;
        }
    }

    fn begin_session(&mut self) {
        let id = Uuid::new_v4();
        let seed = self.config.seed.unwrap_or_else(rand::random);

        let (step_tx, step_rx) = mpsc::channel(self.config.step_queue_capacity.max(1));
        let subscription = SensorSubscription::open(id, self.source.as_ref(), step_tx);

        self.steering_override = None;
        self.tally.reset_session();
        self.active = Some(ActiveSession {
            id,
            engine: SnakeEngine::new(self.engine_config.clone(), seed),
            step_rx,
            _subscription: subscription,
            snapshots: SnapshotBuilder::new(id),
            simulated_steps: 0,
            paused: false,
            game_over: false,
        });

        info!(session_id = %id, seed, "Session started");
    }

    fn end_session(&mut self, reason: &'static str) {
        if let Some(session) = self.active.take() {
            info!(
                session_id = %session.id,
                reason,
                score = session.engine.score(),
                ticks = session.snapshots.tick(),
                avg_segments = session.snapshots.stats().avg_segments_per_snapshot,
                "Session ended"
            );
        }
    }

    /// Advance the active session by one tick and publish its snapshot
    fn run_tick(&mut self) -> Option<SessionSnapshot> {
        let heading = self
            .steering_override
            .unwrap_or_else(|| *self.heading_rx.borrow());
        let session = self.active.as_mut()?;

        let mut steps = 0usize;
        while steps < self.config.max_steps_per_tick {
            match session.step_rx.try_recv() {
                Ok(step) => {
                    steps += 1;
                    let _ = self.step_tx.send(step);
                }
                Err(_) => break,
            }
        }
        self.tally.record(steps as u64);
        let simulated = std::mem::take(&mut session.simulated_steps);

        if !session.frozen() {
            session.engine.turn_to_degrees(heading);
            for _ in 0..steps {
                session.engine.on_step_detected(1);
            }
            if simulated > 0 {
                session.engine.on_step_detected(simulated);
            }
            if self.config.baseline_speed > 0.0 {
                session.engine.tick_baseline(self.config.baseline_speed);
            }
        }

        let state = session.engine.get_state();
        if state.is_game_over && !session.game_over {
            session.game_over = true;
            session.paused = true;
            info!(session_id = %session.id, score = state.score, "Game over");
        }

        let snapshot = session.snapshots.build(state, session.paused, &self.tally);
        let _ = self.snapshot_tx.send(snapshot.clone());
        Some(snapshot)
    }
}
