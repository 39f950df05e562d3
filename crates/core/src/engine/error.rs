//! Errors raised while executing a run.

use crate::frames::{FrameId, SequenceError};
use crate::models::ModelError;
use crate::tools::executor::ToolError;
use std::path::PathBuf;
use thiserror::Error;
use vs_protocol::Stage;

/// Everything that can end a run early.
///
/// The engine turns these into a [`vs_protocol::RunDisposition`]; the
/// `Display` text of every variant except `Cancelled` becomes the
/// user-facing failure reason.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing or unreadable input video, or an unusable parameter.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External tool failed: {0}")]
    ExternalToolFailure(#[from] ToolError),

    #[error("No frames were extracted from {}", .0.display())]
    EmptyExtraction(PathBuf),

    #[error("Failed to load {role} model: {source}")]
    ModelLoadFailure {
        role: &'static str,
        source: ModelError,
    },

    #[error("Inference failed on frame {frame}: {source}")]
    InferenceFailure { frame: FrameId, source: ModelError },

    /// A stage finished without producing every frame of the run.
    #[error("The {stage} stage left an incomplete sequence: frame {missing} of {expected} is missing from {}", .dir.display())]
    IncompleteSequence {
        stage: Stage,
        dir: PathBuf,
        missing: FrameId,
        expected: usize,
    },

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error("Failed to read or write frame {}: {source}", .path.display())]
    FrameIo {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Workspace error at {}: {source}", .path.display())]
    Workspace {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stage panicked. Carries the panic message when it had one.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Cancellation was requested. Not a failure.
    #[error("Run cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Convert a caught panic payload into an `Internal` error.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "stage panicked".to_string());
        Self::Internal(message)
    }
}
