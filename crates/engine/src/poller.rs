use crate::dashboard::DashboardEngine;
use crate::reconcile::TickOutcome;
use crate::transport::Transport;
use crate::view::{Notice, ViewEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

enum PollerState {
    Idle,
    Polling {
        cancel: CancellationToken,
        handle: JoinHandle<()>,
    },
}

/// Drives [`DashboardEngine::tick`] on a fixed cadence. The next tick is
/// scheduled only after the previous one has settled, so ticks never
/// overlap.
pub struct Poller {
    state: PollerState,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new()
    }
}

impl Poller {
    pub fn new() -> Self {
        Self {
            state: PollerState::Idle,
        }
    }

    pub fn is_polling(&self) -> bool {
        matches!(self.state, PollerState::Polling { .. })
    }

    /// Start polling. Restarts the timer if already running.
    pub fn start<T: Transport>(
        &mut self,
        engine: Arc<Mutex<DashboardEngine<T>>>,
        interval: Duration,
        events: mpsc::Sender<ViewEvent>,
    ) {
        self.stop();
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            run_poller(engine, interval, events, task_cancel).await;
        });
        self.state = PollerState::Polling { cancel, handle };
        info!(interval_ms = interval.as_millis() as u64, "polling started");
    }

    /// Stop polling. Returns false if already idle.
    pub fn stop(&mut self) -> bool {
        match std::mem::replace(&mut self.state, PollerState::Idle) {
            PollerState::Polling { cancel, .. } => {
                cancel.cancel();
                info!("polling stopped");
                true
            }
            PollerState::Idle => false,
        }
    }

    /// Stop and wait for the task to exit.
    pub async fn shutdown(&mut self) {
        if let PollerState::Polling { cancel, handle } =
            std::mem::replace(&mut self.state, PollerState::Idle)
        {
            cancel.cancel();
            if let Err(e) = handle.await {
                debug!(error = %e, "poller task ended abnormally");
            }
            info!("polling stopped");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_poller<T: Transport>(
    engine: Arc<Mutex<DashboardEngine<T>>>,
    interval: Duration,
    events: mpsc::Sender<ViewEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let event = {
            let mut engine = tokio::select! {
                _ = cancel.cancelled() => break,
                guard = engine.lock() => guard,
            };
            // Dropping a tick mid-flight is safe: it commits only after its last await.
            let outcome = tokio::select! {
                _ = cancel.cancelled() => None,
                outcome = engine.tick() => Some(outcome),
            };
            let Some(outcome) = outcome else {
                break;
            };
            match outcome {
                TickOutcome::Rebuild(_) => ViewEvent::Rebuild(Box::new(engine.snapshot())),
                TickOutcome::Refresh => ViewEvent::Refresh(Box::new(engine.snapshot())),
                TickOutcome::Failed(reason) => {
                    ViewEvent::Notice(Notice::error(format!("Refresh failed: {reason}")))
                }
            }
        };

        if events.send(event).await.is_err() {
            debug!("view receiver dropped, stopping poller");
            break;
        }
    }
}
