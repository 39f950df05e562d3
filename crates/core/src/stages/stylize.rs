//! Stylization.

use crate::engine::error::PipelineError;
use crate::engine::progress::STYLIZE;
use crate::engine::workspace::RunWorkspace;
use crate::frames::{load_frame, save_frame, FrameSequence};
use crate::models::{
    Conditioning, DeviceResident, GenerationRequest, GeneratorSpec, ImageGenerator, ModelLoader,
    SeedGenerator,
};
use crate::stages::{log_release, StageContext};
use std::path::Path;

/// Directory holding the conditioning image of every frame.
pub fn conditioning_dir(workspace: &RunWorkspace, conditioning: Conditioning) -> &Path {
    match conditioning {
        Conditioning::PoseConditioned => &workspace.pose_dir,
        Conditioning::ImageToImage { .. } => &workspace.raw_dir,
    }
}

/// Generate one stylized frame per conditioning image.
///
/// The generator is loaded before the first frame, so a load failure never
/// leaves a partial sequence behind. The random generator is reset to the
/// run's seed for every frame.
pub async fn stylize_frames(
    ctx: StageContext<'_>,
    loader: &dyn ModelLoader,
    frames: &FrameSequence,
    conditioning: Conditioning,
) -> Result<(), PipelineError> {
    ctx.tracker
        .progress(STYLIZE.start(), "Loading generative model")
        .await;

    let spec = GeneratorSpec::new(ctx.config, conditioning);
    let mut generator = loader
        .load_generator(&spec)
        .await
        .map_err(|source| PipelineError::ModelLoadFailure {
            role: "generative",
            source,
        })?;

    let outcome = generate_all(ctx, generator.as_mut(), frames, conditioning).await;
    log_release("generative", generator.release().await);
    outcome
}

async fn generate_all(
    ctx: StageContext<'_>,
    model: &mut dyn ImageGenerator,
    frames: &FrameSequence,
    conditioning: Conditioning,
) -> Result<(), PipelineError> {
    let config = ctx.config;
    let ws = ctx.workspace;
    let source_dir = conditioning_dir(ws, conditioning);
    let total = frames.len();

    for (done, id) in frames.iter().enumerate() {
        ctx.checkpoint()?;

        let source_path = id.path_in(source_dir, &ws.extension);
        let image = load_frame(source_path.clone())
            .await
            .map_err(|source| PipelineError::FrameIo {
                path: source_path,
                source,
            })?;

        let mut generator = SeedGenerator::new(config.seed);
        let request = GenerationRequest {
            prompt: &config.prompt,
            negative_prompt: &config.negative_prompt,
            image,
            steps: config.steps,
            guidance_scale: config.guidance_scale,
            generator: &mut generator,
            strength: conditioning.strength(),
        };

        let output = model
            .generate(request)
            .await
            .map_err(|source| PipelineError::InferenceFailure { frame: id, source })?;

        let output_path = id.path_in(&ws.frames_dir, &ws.extension);
        save_frame(output, output_path.clone())
            .await
            .map_err(|source| PipelineError::FrameIo {
                path: output_path,
                source,
            })?;

        if let Err(e) = model.clear_cache().await {
            tracing::warn!(frame = %id, error = %e, "Failed to clear device cache");
        }

        tracing::debug!(frame = %id, "Frame stylized");
        ctx.tracker
            .progress(
                STYLIZE.at(done + 1, total),
                format!("Stylizing frame {}/{}", done + 1, total),
            )
            .await;
    }

    Ok(())
}
