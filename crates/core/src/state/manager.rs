//! Run manager for coordinating stylization runs.
//!
//! The RunManager starts runs on background tasks so the caller stays
//! responsive, keeps a registry of their live state and forwards
//! cancellation requests to them.

use crate::engine::PipelineEngine;
use crate::models::ModelLoader;
use crate::state::run::RunTracker;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use vs_protocol::{Event, Run, RunConfig, RunDisposition};

/// Registry entry of one run.
struct RunHandle {
    state: Arc<Mutex<Run>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<RunDisposition>>,
}

/// Manages all stylization runs.
///
/// Runs share nothing but the engine; each has its own configuration,
/// cancellation token and state record.
pub struct RunManager {
    /// Registry of all runs, indexed by their UUID.
    runs: Arc<Mutex<HashMap<Uuid, RunHandle>>>,

    engine: Arc<PipelineEngine>,

    /// Channel receiving the events of every run.
    events_tx: mpsc::UnboundedSender<Event>,
}

impl RunManager {
    /// Create a new RunManager.
    ///
    /// # Arguments
    ///
    /// * `loader` - Source of the pose and generative models
    /// * `events_tx` - Channel for sending events to the caller
    pub fn new(loader: Arc<dyn ModelLoader>, events_tx: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            runs: Arc::new(Mutex::new(HashMap::new())),
            engine: Arc::new(PipelineEngine::new(loader)),
            events_tx,
        }
    }

    /// Start a run in the background and return its id.
    ///
    /// The run is registered before its task is spawned, so the id can be
    /// used with the other methods right away.
    pub async fn start_run(&self, config: RunConfig) -> Uuid {
        let tracker = RunTracker::new(config.input_video.clone(), self.events_tx.clone());
        let run_id = tracker.id();
        let cancel = CancellationToken::new();

        let mut runs = self.runs.lock().await;

        let engine = Arc::clone(&self.engine);
        let token = cancel.clone();
        let state = tracker.shared();
        let task = tokio::spawn(async move { engine.execute(&config, &tracker, &token).await });

        runs.insert(
            run_id,
            RunHandle {
                state,
                cancel,
                task: Some(task),
            },
        );

        tracing::info!(%run_id, "Run started");
        run_id
    }

    /// Request cancellation of a run.
    ///
    /// The run stops at its next frame or stage boundary. Cancelling a run
    /// that already ended has no effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the run is not found.
    pub async fn cancel_run(&self, run_id: Uuid) -> Result<()> {
        let runs = self.runs.lock().await;
        let handle = runs
            .get(&run_id)
            .ok_or_else(|| anyhow!("Run {} not found", run_id))?;
        handle.cancel.cancel();
        Ok(())
    }

    /// Wait for a run to end and return its disposition.
    ///
    /// # Errors
    ///
    /// Returns an error if the run is not found, is already being waited on,
    /// or its task panicked.
    pub async fn wait_run(&self, run_id: Uuid) -> Result<RunDisposition> {
        let task = {
            let mut runs = self.runs.lock().await;
            let handle = runs
                .get_mut(&run_id)
                .ok_or_else(|| anyhow!("Run {} not found", run_id))?;
            handle
                .task
                .take()
                .ok_or_else(|| anyhow!("Run {} is already being awaited", run_id))?
        };

        task.await
            .map_err(|e| anyhow!("Run {} terminated abnormally: {}", run_id, e))
    }

    /// Get the current state of a run.
    pub async fn get_run(&self, run_id: Uuid) -> Option<Run> {
        let state = {
            let runs = self.runs.lock().await;
            Arc::clone(&runs.get(&run_id)?.state)
        };
        let run = state.lock().await;
        Some(run.clone())
    }

    /// Get the state of every run.
    pub async fn get_all_runs(&self) -> Vec<Run> {
        let states: Vec<_> = {
            let runs = self.runs.lock().await;
            runs.values().map(|handle| Arc::clone(&handle.state)).collect()
        };

        let mut result = Vec::with_capacity(states.len());
        for state in states {
            result.push(state.lock().await.clone());
        }
        result
    }

    /// Get the number of registered runs.
    pub async fn run_count(&self) -> usize {
        self.runs.lock().await.len()
    }
}
