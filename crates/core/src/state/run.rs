//! Run state machine.
//!
//! A [`RunTracker`] owns the live [`Run`] record of one run and the sending
//! half of the event channel. Every state transition updates the record and
//! emits the matching [`Event`]. Sends never block, and a caller that has
//! stopped listening does not affect the run.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use uuid::Uuid;
use vs_protocol::{Event, Run, RunDisposition, RunStatus, Stage};

/// Create a new Run with Pending status.
pub fn create_run(input_video: PathBuf) -> Run {
    Run {
        id: Uuid::new_v4(),
        input_video,
        status: RunStatus::Pending,
        stage: None,
        percent: 0,
        status_message: String::new(),
        frame_count: None,
        started_at: Utc::now(),
        completed_at: None,
        disposition: None,
    }
}

/// Shared handle on one run's state and event channel.
#[derive(Clone)]
pub struct RunTracker {
    id: Uuid,
    run: Arc<Mutex<Run>>,
    events_tx: UnboundedSender<Event>,
}

impl RunTracker {
    pub fn new(input_video: PathBuf, events_tx: UnboundedSender<Event>) -> Self {
        let run = create_run(input_video);
        Self {
            id: run.id,
            run: Arc::new(Mutex::new(run)),
            events_tx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The shared run record, for registries that outlive the run.
    pub fn shared(&self) -> Arc<Mutex<Run>> {
        Arc::clone(&self.run)
    }

    /// Copy of the current run record.
    pub async fn snapshot(&self) -> Run {
        self.run.lock().await.clone()
    }

    fn emit(&self, event: Event) {
        let _ = self.events_tx.send(event);
    }

    /// Pending -> Running.
    pub async fn start(&self) {
        let input_video = {
            let mut run = self.run.lock().await;
            run.status = RunStatus::Running;
            run.started_at = Utc::now();
            run.input_video.clone()
        };
        self.emit(Event::RunStarted {
            run_id: self.id,
            input_video,
        });
    }

    pub async fn enter_stage(&self, stage: Stage) {
        self.run.lock().await.stage = Some(stage);
        tracing::info!(run_id = %self.id, %stage, "Stage started");
        self.emit(Event::StageStarted {
            run_id: self.id,
            stage,
        });
    }

    /// Record a progress checkpoint.
    ///
    /// `percent` is clamped to [0, 100] and never moves backwards: a lower
    /// value than the current one is reported as the current one.
    pub async fn progress(&self, percent: u8, status: impl Into<String>) {
        let status = status.into();
        let percent = {
            let mut run = self.run.lock().await;
            run.percent = run.percent.max(percent.min(100));
            run.status_message = status.clone();
            run.percent
        };
        tracing::debug!(run_id = %self.id, percent, "{status}");
        self.emit(Event::Progress {
            run_id: self.id,
            percent,
            status,
        });
    }

    pub async fn set_frame_count(&self, frame_count: usize) {
        self.run.lock().await.frame_count = Some(frame_count);
    }

    /// Move to the terminal status matching `disposition` and emit the
    /// terminal event.
    pub async fn finish(&self, disposition: RunDisposition) {
        {
            let mut run = self.run.lock().await;
            run.status = disposition.status();
            run.completed_at = Some(Utc::now());
            run.disposition = Some(disposition.clone());
        }

        let event = match disposition {
            RunDisposition::Completed {
                final_video,
                frame_count,
            } => Event::RunCompleted {
                run_id: self.id,
                final_video,
                frame_count,
            },
            RunDisposition::Cancelled => Event::RunCancelled { run_id: self.id },
            RunDisposition::Failed { reason } => Event::RunError {
                run_id: self.id,
                error: reason,
            },
        };
        self.emit(event);
    }
}
