//! Scoped sensor subscriptions
//!
//! A subscription owns the pump task that pulls samples from a source, runs
//! them through the session's detector, and queues the resulting steps. The
//! task is aborted when the subscription is dropped.

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Sample, StepEvent, StepFusionDetector};

/// Something that can deliver a fresh sample stream for each session
pub trait SampleSource: Send + Sync {
    fn subscribe(&self) -> BoxStream<'static, Sample>;
}

/// Fixed sample sequence, replayed from the start on every subscription
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    samples: Vec<Sample>,
}

impl ReplaySource {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}

impl SampleSource for ReplaySource {
    fn subscribe(&self) -> BoxStream<'static, Sample> {
        futures::stream::iter(self.samples.clone()).boxed()
    }
}

/// Live link between a sample stream and a session's step queue
pub struct SensorSubscription {
    session_id: Uuid,
    task: JoinHandle<()>,
}

impl SensorSubscription {
    /// Start pumping samples through a fresh detector
    pub fn spawn(
        session_id: Uuid,
        mut samples: BoxStream<'static, Sample>,
        step_tx: mpsc::Sender<StepEvent>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut detector = StepFusionDetector::new();

            while let Some(sample) = samples.next().await {
                if let Some(step) = detector.process(&sample) {
                    // Waits for queue capacity rather than dropping the step
                    if step_tx.send(step).await.is_err() {
                        break;
                    }
                }
            }

            debug!(
                session_id = %session_id,
                steps = detector.steps_emitted(),
                "Sample stream finished"
            );
        });

        info!(session_id = %session_id, "Sensor subscription opened");
        Self { session_id, task }
    }

    /// Subscribe to a source and start pumping
    pub fn open(
        session_id: Uuid,
        source: &dyn SampleSource,
        step_tx: mpsc::Sender<StepEvent>,
    ) -> Self {
        Self::spawn(session_id, source.subscribe(), step_tx)
    }

    /// Whether the pump is still consuming samples
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SensorSubscription {
    fn drop(&mut self) {
        self.task.abort();
        info!(session_id = %self.session_id, "Sensor subscription closed");
    }
}
