//! Video assembly.

use crate::engine::error::PipelineError;
use crate::engine::progress::ASSEMBLE;
use crate::frames::FrameSequence;
use crate::stages::StageContext;
use crate::tools::executor::ToolExecutor;
use crate::tools::ffmpeg;
use std::path::PathBuf;

/// Encode the stylized frames into the final video and return its path.
///
/// Only the first `frames.len()` frames are encoded, so higher-numbered
/// frames left in the persistent directory by an earlier, longer run are
/// never picked up.
pub async fn assemble_video(
    ctx: StageContext<'_>,
    frames: &FrameSequence,
) -> Result<PathBuf, PipelineError> {
    let ws = ctx.workspace;

    ctx.tracker
        .progress(ASSEMBLE.start(), "Assembling video")
        .await;

    let invocation = ffmpeg::assemble_video(
        &ctx.config.tools,
        &ws.frames_dir,
        &ws.extension,
        frames.len(),
        ctx.config.target_fps,
        &ws.final_video,
    );
    ToolExecutor::run(&invocation).await?;

    tracing::info!(video = %ws.final_video.display(), "Assembled video");
    ctx.tracker.progress(ASSEMBLE.end(), "Done").await;

    Ok(ws.final_video.clone())
}
