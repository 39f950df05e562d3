//! Runtime run state models.
//!
//! This module defines the structures for tracking the state of a
//! stylization run while it executes and after it terminates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use ts_rs::TS;
use uuid::Uuid;

/// Lifecycle status of a run.
///
/// Pending -> Running -> Completed | Cancelled | Failed
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Created but not started yet.
    Pending,

    Running,

    Completed,

    /// Stopped at a frame or stage boundary on user request.
    Cancelled,

    Failed,
}

impl RunStatus {
    /// Whether the run has reached a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// The pipeline stages, in execution order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Input validation and workspace provisioning.
    Prepare,
    Extract,
    Pose,
    Stylize,
    Assemble,
    /// Removal of the transient subtree.
    Cleanup,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Extract => "extract",
            Self::Pose => "pose",
            Self::Stylize => "stylize",
            Self::Assemble => "assemble",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a run ended.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RunDisposition {
    Completed {
        final_video: PathBuf,
        frame_count: usize,
    },

    /// User-initiated stop. Not an error.
    Cancelled,

    Failed {
        reason: String,
    },
}

impl RunDisposition {
    pub fn status(&self) -> RunStatus {
        match self {
            Self::Completed { .. } => RunStatus::Completed,
            Self::Cancelled => RunStatus::Cancelled,
            Self::Failed { .. } => RunStatus::Failed,
        }
    }
}

/// Live state of one run.
#[derive(Serialize, Deserialize, Debug, Clone, TS)]
pub struct Run {
    #[ts(type = "string")]
    pub id: Uuid,

    pub input_video: PathBuf,

    pub status: RunStatus,

    /// Stage currently executing, or the last one entered.
    pub stage: Option<Stage>,

    /// Progress percentage in [0, 100]; never decreases.
    pub percent: u8,

    /// Latest human-readable status line.
    pub status_message: String,

    /// Number of frames produced by extraction, once known.
    pub frame_count: Option<usize>,

    #[ts(type = "string")]
    pub started_at: DateTime<Utc>,

    #[ts(type = "string | null")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Set once the run terminates.
    pub disposition: Option<RunDisposition>,
}
