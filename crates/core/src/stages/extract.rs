//! Frame extraction.

use crate::engine::error::PipelineError;
use crate::engine::progress::EXTRACT;
use crate::frames::FrameSequence;
use crate::stages::StageContext;
use crate::tools::executor::ToolExecutor;
use crate::tools::ffmpeg;

/// Decode the input video into numbered frames in the raw directory.
///
/// The frames found afterwards define the run's frame count. No frames at
/// all is an `EmptyExtraction` failure.
pub async fn extract_frames(ctx: StageContext<'_>) -> Result<FrameSequence, PipelineError> {
    let config = ctx.config;
    let ws = ctx.workspace;

    ctx.tracker
        .progress(
            EXTRACT.start(),
            format!("Extracting frames at {} fps", config.target_fps),
        )
        .await;

    let invocation = ffmpeg::extract_frames(
        &config.tools,
        &config.input_video,
        &ws.raw_dir,
        config.target_fps,
        config.target_width,
        &ws.extension,
    );
    ToolExecutor::run(&invocation).await?;

    let frames = FrameSequence::scan(&ws.raw_dir, &ws.extension)?;
    if frames.is_empty() {
        return Err(PipelineError::EmptyExtraction(config.input_video.clone()));
    }

    tracing::info!(frames = frames.len(), "Extracted frames");
    ctx.tracker.set_frame_count(frames.len()).await;
    ctx.tracker
        .progress(EXTRACT.end(), format!("Extracted {} frames", frames.len()))
        .await;

    Ok(frames)
}
