//! Progress and notification protocol.
//!
//! The pipeline reports to its caller through a one-way channel of `Event`s.
//! The caller renders them; it never acknowledges them, and the pipeline
//! never waits on the caller.
//!
//! Uses tagged enum serialization so a frontend can dispatch on `type`:
//! ```json
//! {
//!   "type": "progress",
//!   "payload": {
//!     "run_id": "uuid-here",
//!     "percent": 42,
//!     "status": "Stylizing frame 3/120"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use ts_rs::TS;
use uuid::Uuid;

use crate::run_models::Stage;

/// Events sent from the pipeline to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// A run has been accepted and its worker started.
    RunStarted {
        #[ts(type = "string")]
        run_id: Uuid,
        input_video: PathBuf,
    },

    /// A stage has begun.
    StageStarted {
        #[ts(type = "string")]
        run_id: Uuid,
        stage: Stage,
    },

    /// A checkpoint was reached. `percent` never decreases within a run.
    Progress {
        #[ts(type = "string")]
        run_id: Uuid,
        percent: u8,
        status: String,
    },

    /// The run finished and the final video was written.
    RunCompleted {
        #[ts(type = "string")]
        run_id: Uuid,
        final_video: PathBuf,
        frame_count: usize,
    },

    /// The run stopped because cancellation was requested.
    RunCancelled {
        #[ts(type = "string")]
        run_id: Uuid,
    },

    /// The run failed. `error` is meant to be shown to the user as is.
    RunError {
        #[ts(type = "string")]
        run_id: Uuid,
        error: String,
    },
}

impl Event {
    /// The run this event belongs to.
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::StageStarted { run_id, .. }
            | Self::Progress { run_id, .. }
            | Self::RunCompleted { run_id, .. }
            | Self::RunCancelled { run_id }
            | Self::RunError { run_id, .. } => *run_id,
        }
    }

    /// Whether this is the last event of a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RunCompleted { .. } | Self::RunCancelled { .. } | Self::RunError { .. }
        )
    }
}
