//! Per-run directory layout.
//!
//! ```text
//! <output_dir>/
//! ├── <transient>/          removed when the run ends
//! │   ├── raw/frame_0001.jpg
//! │   └── pose/frame_0001.jpg
//! ├── <frames_dir>/frame_0001.jpg
//! └── <video_file>
//! ```

use crate::engine::error::PipelineError;
use std::io;
use std::path::{Component, Path, PathBuf};
use vs_protocol::RunConfig;

pub const RAW_DIR: &str = "raw";
pub const POSE_DIR: &str = "pose";

/// Paths of one run's workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunWorkspace {
    pub output_dir: PathBuf,
    pub transient_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub pose_dir: PathBuf,
    pub frames_dir: PathBuf,
    pub final_video: PathBuf,
    pub extension: String,
    /// False when the layout failed `check_layout`; such a workspace never
    /// deletes anything.
    owns_transient: bool,
}

impl RunWorkspace {
    pub fn new(config: &RunConfig) -> Self {
        let layout = &config.workspace;
        let output_dir = config.output_dir.clone();
        let transient_dir = output_dir.join(&layout.transient_dir);

        Self {
            raw_dir: transient_dir.join(RAW_DIR),
            pose_dir: transient_dir.join(POSE_DIR),
            frames_dir: output_dir.join(&layout.frames_dir),
            final_video: output_dir.join(&layout.video_file),
            extension: layout.frame_extension.clone(),
            owns_transient: check_layout(config).is_ok(),
            transient_dir,
            output_dir,
        }
    }

    /// Create every directory of the workspace.
    ///
    /// A transient subtree left by an earlier run is deleted first so its
    /// frames can never leak into this run. The persistent frame directory
    /// is kept as is.
    pub async fn provision(&self) -> Result<(), PipelineError> {
        if !self.owns_transient {
            return Err(PipelineError::InvalidInput(format!(
                "refusing to provision unsafe workspace layout under {}",
                self.output_dir.display()
            )));
        }

        if tokio::fs::try_exists(&self.transient_dir)
            .await
            .map_err(|source| workspace_error(&self.transient_dir, source))?
        {
            tracing::info!(path = %self.transient_dir.display(), "Removing stale transient frames");
            tokio::fs::remove_dir_all(&self.transient_dir)
                .await
                .map_err(|source| workspace_error(&self.transient_dir, source))?;
        }

        for dir in [&self.raw_dir, &self.pose_dir, &self.frames_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| workspace_error(dir, source))?;
        }

        Ok(())
    }

    /// Delete the transient subtree. A subtree that does not exist is not an
    /// error.
    pub async fn remove_transient(&self) -> io::Result<()> {
        if !self.owns_transient {
            return Ok(());
        }
        match tokio::fs::remove_dir_all(&self.transient_dir).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Guard that deletes the transient subtree when dropped.
    pub fn guard(&self) -> TransientGuard {
        TransientGuard {
            path: self.owns_transient.then(|| self.transient_dir.clone()),
        }
    }
}

/// Check that the transient subtree can be deleted wholesale: it must be a
/// proper subdirectory of the output directory that shares nothing with the
/// persistent frames or the final video.
pub fn check_layout(config: &RunConfig) -> Result<(), PipelineError> {
    let layout = &config.workspace;
    let transient = Path::new(&layout.transient_dir);

    let is_plain_relative = transient.components().next().is_some()
        && transient
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if !is_plain_relative {
        return Err(PipelineError::InvalidInput(format!(
            "transient directory '{}' must be a relative path below the output directory \
             without '.' or '..' components",
            layout.transient_dir
        )));
    }

    let output_dir = &config.output_dir;
    let transient_dir = output_dir.join(transient);
    let frames_dir = output_dir.join(&layout.frames_dir);
    if frames_dir.starts_with(&transient_dir) || transient_dir.starts_with(&frames_dir) {
        return Err(PipelineError::InvalidInput(format!(
            "transient directory '{}' and frame directory '{}' must not contain each other",
            layout.transient_dir, layout.frames_dir
        )));
    }
    if output_dir.join(&layout.video_file).starts_with(&transient_dir) {
        return Err(PipelineError::InvalidInput(format!(
            "video file '{}' must not be inside the transient directory '{}'",
            layout.video_file, layout.transient_dir
        )));
    }

    Ok(())
}

fn workspace_error(path: &Path, source: io::Error) -> PipelineError {
    PipelineError::Workspace {
        path: path.to_path_buf(),
        source,
    }
}

/// Removes the transient subtree on drop, covering exits that skip the
/// engine's own cleanup, such as a panic or an aborted task.
#[derive(Debug)]
pub struct TransientGuard {
    path: Option<PathBuf>,
}

impl TransientGuard {
    /// Cleanup already happened; do nothing on drop.
    pub fn disarm(mut self) {
        self.path = None;
    }
}

impl Drop for TransientGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove transient frames");
                }
            }
        }
    }
}
