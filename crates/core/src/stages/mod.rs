//! The four pipeline stages.
//!
//! Stages run strictly in order and process frames strictly in index order.
//! Each one reads the previous stage's directory and writes its own; only
//! the current frame is ever held in memory. Cancellation is checked before
//! every frame, never during one.

pub mod assemble;
pub mod extract;
pub mod pose;
pub mod stylize;

use crate::engine::error::PipelineError;
use crate::engine::workspace::RunWorkspace;
use crate::state::run::RunTracker;
use tokio_util::sync::CancellationToken;
use vs_protocol::RunConfig;

pub use assemble::assemble_video;
pub use extract::extract_frames;
pub use pose::extract_poses;
pub use stylize::stylize_frames;

/// What every stage gets to work with.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub config: &'a RunConfig,
    pub workspace: &'a RunWorkspace,
    pub tracker: &'a RunTracker,
    pub cancel: &'a CancellationToken,
}

impl StageContext<'_> {
    /// Fails with `Cancelled` once cancellation has been requested.
    pub fn checkpoint(&self) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Log a failed model release. The stage result stands either way.
pub(crate) fn log_release(role: &str, result: Result<(), crate::models::ModelError>) {
    if let Err(e) = result {
        tracing::warn!(role, error = %e, "Failed to release model");
    }
}
