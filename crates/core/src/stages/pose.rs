//! Pose extraction.

use crate::engine::error::PipelineError;
use crate::engine::progress::POSE;
use crate::frames::{load_frame, save_frame, FrameSequence};
use crate::models::{DeviceResident, ModelLoader, PoseEstimator};
use crate::stages::{log_release, StageContext};

/// Render a pose image for every raw frame.
///
/// The estimator is loaded once for the stage and released when the stage
/// ends, whether it succeeded or not.
pub async fn extract_poses(
    ctx: StageContext<'_>,
    loader: &dyn ModelLoader,
    frames: &FrameSequence,
) -> Result<(), PipelineError> {
    ctx.tracker
        .progress(POSE.start(), "Loading pose model")
        .await;

    let mut estimator = loader
        .load_pose_estimator(&ctx.config.model)
        .await
        .map_err(|source| PipelineError::ModelLoadFailure {
            role: "pose",
            source,
        })?;

    let outcome = estimate_all(ctx, estimator.as_mut(), frames).await;
    log_release("pose", estimator.release().await);
    outcome
}

async fn estimate_all(
    ctx: StageContext<'_>,
    estimator: &mut dyn PoseEstimator,
    frames: &FrameSequence,
) -> Result<(), PipelineError> {
    let ws = ctx.workspace;
    let total = frames.len();

    for (done, id) in frames.iter().enumerate() {
        ctx.checkpoint()?;

        let raw_path = id.path_in(&ws.raw_dir, &ws.extension);
        let raw = load_frame(raw_path.clone())
            .await
            .map_err(|source| PipelineError::FrameIo {
                path: raw_path,
                source,
            })?;

        let pose = estimator
            .estimate(raw)
            .await
            .map_err(|source| PipelineError::InferenceFailure { frame: id, source })?;

        let pose_path = id.path_in(&ws.pose_dir, &ws.extension);
        save_frame(pose, pose_path.clone())
            .await
            .map_err(|source| PipelineError::FrameIo {
                path: pose_path,
                source,
            })?;

        tracing::debug!(frame = %id, "Pose extracted");
        ctx.tracker
            .progress(
                POSE.at(done + 1, total),
                format!("Extracting poses: {}/{}", done + 1, total),
            )
            .await;
    }

    Ok(())
}
