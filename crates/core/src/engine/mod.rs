//! Pipeline execution engine.
//!
//! The PipelineEngine runs one stylization run from start to finish:
//! validate, provision the workspace, extract, optionally estimate poses,
//! stylize, assemble, and remove the transient subtree. Every exit path ends
//! with the same cleanup and a single terminal event.

pub mod error;
pub mod progress;
pub mod workspace;

use crate::frames::FrameSequence;
use crate::models::{Conditioning, ModelLoader};
use crate::stages::{self, StageContext};
use crate::state::run::RunTracker;
use error::PipelineError;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use vs_protocol::{RunConfig, RunDisposition, Stage};
use workspace::RunWorkspace;

/// The main pipeline execution engine.
pub struct PipelineEngine {
    loader: Arc<dyn ModelLoader>,
}

impl PipelineEngine {
    /// Create an engine that obtains its models from `loader`.
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self { loader }
    }

    /// Execute one run and return how it ended.
    ///
    /// This never returns an error: stage failures and panics become
    /// `RunDisposition::Failed` and a triggered `cancel` becomes
    /// `RunDisposition::Cancelled`. In every case the transient subtree has
    /// been removed and the terminal event has been sent when this returns.
    ///
    /// # Arguments
    ///
    /// * `config` - The run configuration, read-only for the whole run
    /// * `tracker` - State record and event channel of this run
    /// * `cancel` - Checked before every stage and every frame
    pub async fn execute(
        &self,
        config: &RunConfig,
        tracker: &RunTracker,
        cancel: &CancellationToken,
    ) -> RunDisposition {
        tracker.start().await;

        let workspace = RunWorkspace::new(config);
        let guard = workspace.guard();
        let ctx = StageContext {
            config,
            workspace: &workspace,
            tracker,
            cancel,
        };

        // A panicking stage still gets cleanup and a terminal event.
        let outcome = AssertUnwindSafe(self.run_stages(ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(PipelineError::from_panic(payload)));

        tracker.enter_stage(Stage::Cleanup).await;
        match workspace.remove_transient().await {
            Ok(()) => guard.disarm(),
            Err(e) => {
                tracing::warn!(
                    path = %workspace.transient_dir.display(),
                    error = %e,
                    "Failed to remove transient frames"
                );
                // The guard retries synchronously on drop.
                drop(guard);
            }
        }

        let disposition = match outcome {
            Ok(frames) => {
                tracing::info!(run_id = %tracker.id(), frames = frames.len(), "Run completed");
                RunDisposition::Completed {
                    final_video: workspace.final_video.clone(),
                    frame_count: frames.len(),
                }
            }
            Err(PipelineError::Cancelled) => {
                tracing::info!(run_id = %tracker.id(), "Run cancelled");
                RunDisposition::Cancelled
            }
            Err(e) => {
                tracing::error!(run_id = %tracker.id(), error = %e, "Run failed");
                RunDisposition::Failed {
                    reason: e.to_string(),
                }
            }
        };

        tracker.finish(disposition.clone()).await;
        disposition
    }

    async fn run_stages(&self, ctx: StageContext<'_>) -> Result<FrameSequence, PipelineError> {
        let config = ctx.config;
        let ws = ctx.workspace;
        let tracker = ctx.tracker;

        tracker.enter_stage(Stage::Prepare).await;
        tracker.progress(progress::PREPARE.start(), "Preparing workspace").await;
        validate_config(config)?;
        let conditioning = Conditioning::from_config(config);
        ctx.checkpoint()?;
        ws.provision().await?;
        tracker.progress(progress::PREPARE.end(), "Workspace ready").await;

        ctx.checkpoint()?;
        tracker.enter_stage(Stage::Extract).await;
        let frames = stages::extract_frames(ctx).await?;

        if conditioning.is_pose_conditioned() {
            ctx.checkpoint()?;
            tracker.enter_stage(Stage::Pose).await;
            stages::extract_poses(ctx, self.loader.as_ref(), &frames).await?;
            ensure_complete(Stage::Pose, &ws.pose_dir, &ws.extension, &frames)?;
        } else {
            tracker
                .progress(progress::POSE.end(), "Pose extraction skipped (image-to-image mode)")
                .await;
        }

        ctx.checkpoint()?;
        tracker.enter_stage(Stage::Stylize).await;
        stages::stylize_frames(ctx, self.loader.as_ref(), &frames, conditioning).await?;
        ensure_complete(Stage::Stylize, &ws.frames_dir, &ws.extension, &frames)?;

        ctx.checkpoint()?;
        tracker.enter_stage(Stage::Assemble).await;
        stages::assemble_video(ctx, &frames).await?;

        Ok(frames)
    }
}

/// Reject configurations no stage could run with.
pub fn validate_config(config: &RunConfig) -> Result<(), PipelineError> {
    let invalid = |reason: String| Err(PipelineError::InvalidInput(reason));

    check_input_video(&config.input_video)?;

    if config.target_fps == 0 {
        return invalid("target frame rate must be greater than 0".to_string());
    }
    if config.target_width == 0 {
        return invalid("target width must be greater than 0".to_string());
    }
    if config.steps == 0 {
        return invalid("step count must be greater than 0".to_string());
    }
    if !config.guidance_scale.is_finite() || config.guidance_scale <= 0.0 {
        return invalid(format!(
            "guidance scale must be a positive number, got {}",
            config.guidance_scale
        ));
    }
    if !config.pose_mode && !(0.0..=1.0).contains(&config.denoising_strength) {
        return invalid(format!(
            "denoising strength must be between 0 and 1, got {}",
            config.denoising_strength
        ));
    }

    workspace::check_layout(config)
}

fn check_input_video(path: &Path) -> Result<(), PipelineError> {
    if path.as_os_str().is_empty() {
        return Err(PipelineError::InvalidInput(
            "no input video was given".to_string(),
        ));
    }
    if !path.is_file() {
        return Err(PipelineError::InvalidInput(format!(
            "input video {} does not exist or is not a file",
            path.display()
        )));
    }
    std::fs::File::open(path).map_err(|e| {
        PipelineError::InvalidInput(format!(
            "input video {} is not readable: {e}",
            path.display()
        ))
    })?;
    Ok(())
}

/// Fail unless every frame of `frames` exists in `dir`.
fn ensure_complete(
    stage: Stage,
    dir: &Path,
    extension: &str,
    frames: &FrameSequence,
) -> Result<(), PipelineError> {
    match frames.first_missing_in(dir, extension) {
        None => Ok(()),
        Some(missing) => Err(PipelineError::IncompleteSequence {
            stage,
            dir: PathBuf::from(dir),
            missing,
            expected: frames.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn config_with_input(dir: &Path) -> RunConfig {
        let input = dir.join("in.mp4");
        fs::write(&input, b"not really a video").unwrap();
        RunConfig {
            input_video: input,
            output_dir: dir.join("output"),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let dir = tempdir().unwrap();
        assert!(validate_config(&config_with_input(dir.path())).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_input() {
        let config = RunConfig {
            input_video: PathBuf::from("/definitely/not/here.mp4"),
            ..RunConfig::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(ref m) if m.contains("does not exist")));

        let err = validate_config(&RunConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn test_validate_rejects_directory_as_input() {
        let dir = tempdir().unwrap();
        let config = RunConfig {
            input_video: dir.path().to_path_buf(),
            ..RunConfig::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let dir = tempdir().unwrap();
        let base = config_with_input(dir.path());

        let cases = [
            RunConfig { target_fps: 0, ..base.clone() },
            RunConfig { target_width: 0, ..base.clone() },
            RunConfig { steps: 0, ..base.clone() },
            RunConfig { guidance_scale: f32::NAN, ..base.clone() },
            RunConfig { guidance_scale: -1.0, ..base.clone() },
            RunConfig { pose_mode: false, denoising_strength: 1.5, ..base.clone() },
        ];

        for config in cases {
            assert!(
                matches!(validate_config(&config), Err(PipelineError::InvalidInput(_))),
                "expected rejection for {config:?}"
            );
        }
    }

    #[test]
    fn test_validate_rejects_unsafe_transient_dir() {
        let dir = tempdir().unwrap();
        let base = config_with_input(dir.path());

        for transient_dir in ["", ".", "./", "..", "../elsewhere", "a/../b", "/tmp/scratch"] {
            let mut config = base.clone();
            config.workspace.transient_dir = transient_dir.to_string();
            assert!(
                matches!(validate_config(&config), Err(PipelineError::InvalidInput(_))),
                "expected rejection for transient dir {transient_dir:?}"
            );
        }

        let mut nested = base.clone();
        nested.workspace.transient_dir = "scratch/run".to_string();
        assert!(validate_config(&nested).is_ok());
    }

    #[test]
    fn test_validate_rejects_overlapping_layout() {
        let dir = tempdir().unwrap();
        let base = config_with_input(dir.path());

        let overlapping = [
            ("frames", "frames", "final.mp4"),
            ("frames", "frames/out", "final.mp4"),
            ("temp/raw", "temp", "final.mp4"),
            ("temp", "frames_out", "temp/final.mp4"),
            ("temp", "", "final.mp4"),
        ];
        for (transient_dir, frames_dir, video_file) in overlapping {
            let mut config = base.clone();
            config.workspace.transient_dir = transient_dir.to_string();
            config.workspace.frames_dir = frames_dir.to_string();
            config.workspace.video_file = video_file.to_string();
            assert!(
                matches!(validate_config(&config), Err(PipelineError::InvalidInput(_))),
                "expected rejection for {transient_dir:?} / {frames_dir:?} / {video_file:?}"
            );
        }

        // Sibling names that merely share a prefix are fine.
        let mut siblings = base.clone();
        siblings.workspace.transient_dir = "frames_tmp".to_string();
        siblings.workspace.frames_dir = "frames".to_string();
        assert!(validate_config(&siblings).is_ok());
    }

    #[test]
    fn test_strength_ignored_in_pose_mode() {
        let dir = tempdir().unwrap();
        let config = RunConfig {
            pose_mode: true,
            denoising_strength: 7.0,
            ..config_with_input(dir.path())
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_ensure_complete_reports_first_gap() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("frame_0001.jpg"), b"x").unwrap();
        fs::write(dir.path().join("frame_0003.jpg"), b"x").unwrap();

        let err = ensure_complete(
            Stage::Pose,
            dir.path(),
            "jpg",
            &FrameSequence::with_len(3),
        )
        .unwrap_err();

        match err {
            PipelineError::IncompleteSequence {
                stage,
                missing,
                expected,
                ..
            } => {
                assert_eq!(stage, Stage::Pose);
                assert_eq!(missing.index(), 2);
                assert_eq!(expected, 3);
            }
            other => panic!("Expected IncompleteSequence, got {other:?}"),
        }
    }
}
