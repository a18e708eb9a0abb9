//! Stride Serpent demo - runs a game session fed by a synthetic walker
//!
//! The walker produces accelerometer and gyroscope samples at a steady
//! cadence while a slowly turning compass drives the heading. Sessions
//! restart automatically on game over.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stride_serpent::config::Config;
use stride_serpent::game::GameSession;
use stride_serpent::sensor::heading_channel;
use stride_serpent::sensor::synthetic::SyntheticWalk;
use stride_serpent::util::time::{init_clock, uptime_secs};

/// Compass rotation of the demo walker
const DEMO_TURN_DEGREES_PER_SEC: f32 = 24.0;
const DEMO_COMPASS_PERIOD: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level, config.log_json);
    init_clock();

    info!("Starting Stride Serpent");
    info!(
        width = config.canvas_width,
        height = config.canvas_height,
        tick_rate_hz = config.tick_rate_hz,
        cadence_ms = config.demo_cadence_ms,
        "Demo configuration"
    );

    let source = Arc::new(SyntheticWalk::with_cadence(config.demo_cadence_ms));
    let (mut heading, heading_rx) = heading_channel();

    // Slowly turning compass
    let compass = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(DEMO_COMPASS_PERIOD);
        let mut azimuth = 0.0f32;
        loop {
            ticker.tick().await;
            azimuth += DEMO_TURN_DEGREES_PER_SEC * DEMO_COMPASS_PERIOD.as_secs_f32();
            heading.publish_azimuth(azimuth);
        }
    });

    let (session, handle) =
        GameSession::new(config.scheduler(), config.engine(), source, heading_rx);
    let mut snapshots = handle.subscribe();
    let scheduler = tokio::spawn(session.run());

    handle.start().await?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut last_score = 0;
    let mut restarting = None;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            received = snapshots.recv() => {
                let snapshot = match received {
                    Ok(snapshot) => snapshot,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Snapshot reader fell behind");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                if config.snapshot_json {
                    println!("{}", serde_json::to_string(&snapshot)?);
                }

                if snapshot.state.score != last_score {
                    last_score = snapshot.state.score;
                    info!(
                        score = last_score,
                        steps = snapshot.session_steps,
                        calories = snapshot.calories,
                        "Score changed"
                    );
                }

                if snapshot.state.is_game_over && restarting != Some(snapshot.session_id) {
                    info!(
                        score = snapshot.state.score,
                        steps = snapshot.session_steps,
                        total_steps = snapshot.total_steps,
                        uptime_secs = uptime_secs(),
                        "Game over, restarting"
                    );
                    restarting = Some(snapshot.session_id);
                    last_score = 0;
                    handle.restart().await?;
                }
            }
        }
    }

    compass.abort();
    if handle.shutdown().await.is_err() {
        warn!("Scheduler already stopped");
    }
    scheduler.await?;

    info!("Shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
