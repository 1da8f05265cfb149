//! Autosave sweep.
//!
//! A timer-driven loop that feeds dirty notes to the save engine,
//! sequentially. The engine's single-flight lock makes the ordering
//! guarantee trivial; the sweep only decides *when* to try again.

use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::engine::SyncEngine;

pub struct Autosave {
    engine: Arc<SyncEngine>,
    period: Duration,
}

impl Autosave {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        let period = Duration::from_secs(engine.config().autosave_secs);
        Self { engine, period }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Spawn the sweep loop and return a handle for graceful shutdown.
    pub fn start(self) -> AutosaveHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; skip it so a fresh
            // start does not sweep before anything can be dirty.
            ticker.tick().await;

            loop {
                select! {
                    _ = shutdown_rx.recv() => {
                        debug!("autosave loop stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.sweep().await;
                    }
                }
            }
        });

        AutosaveHandle { shutdown_tx, task }
    }

    async fn sweep(&self) {
        if !self.engine.config().is_configured() {
            debug!("no target document configured; skipping sweep");
            return;
        }

        let dirty = {
            let store = self.engine.store().lock().await;
            store.dirty_ids()
        };
        if dirty.is_empty() {
            return;
        }

        info!(count = dirty.len(), "autosave sweep");
        for id in dirty {
            match self.engine.save(id, false).await {
                Ok(outcome) => debug!(note = %id, ?outcome, "sweep save finished"),
                Err(err) => warn!(note = %id, error = %err, "sweep save errored"),
            }
        }
    }
}

pub struct AutosaveHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    /// Signal the loop to stop and wait for it to drain.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}
