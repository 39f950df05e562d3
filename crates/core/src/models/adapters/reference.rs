//! Deterministic CPU backend.
//!
//! Produces plausible-looking frames without any inference runtime, which
//! makes it suitable for dry runs of the whole pipeline.

use crate::models::base::{
    DeviceResident, GenerationRequest, ImageGenerator, ModelError, PoseEstimator,
};
use crate::models::seed::SeedGenerator;
use async_trait::async_trait;
use image::{DynamicImage, GrayImage, Luma, RgbImage};

/// Noise weight used when generating from a pose image, where there is no
/// denoising strength.
pub const POSE_NOISE_WEIGHT: f32 = 0.5;

/// Renders the luma edges of a frame as a white-on-black sketch.
#[derive(Debug, Default)]
pub struct ReferencePoseEstimator;

impl ReferencePoseEstimator {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceResident for ReferencePoseEstimator {}

#[async_trait]
impl PoseEstimator for ReferencePoseEstimator {
    async fn estimate(&mut self, frame: DynamicImage) -> Result<DynamicImage, ModelError> {
        tokio::task::spawn_blocking(move || edge_sketch(&frame))
            .await
            .map_err(join_error)
    }
}

fn edge_sketch(frame: &DynamicImage) -> DynamicImage {
    let luma = frame.to_luma8();
    let (width, height) = luma.dimensions();

    let sketch = GrayImage::from_fn(width, height, |x, y| {
        let here = i16::from(luma.get_pixel(x, y).0[0]);
        let right = i16::from(luma.get_pixel((x + 1).min(width - 1), y).0[0]);
        let below = i16::from(luma.get_pixel(x, (y + 1).min(height - 1)).0[0]);
        let edge = (here - right).abs() + (here - below).abs();
        Luma([edge.min(255) as u8])
    });

    DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(sketch).to_rgb8())
}

fn join_error(e: tokio::task::JoinError) -> ModelError {
    ModelError::Inference(format!("reference backend task failed: {e}"))
}

/// Blends seeded noise into the conditioning image.
///
/// The blend weight is the denoising strength in image-to-image mode and
/// [`POSE_NOISE_WEIGHT`] otherwise. Prompts, steps and guidance do not
/// influence the output.
#[derive(Debug, Default)]
pub struct ReferenceGenerator;

impl ReferenceGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceResident for ReferenceGenerator {}

#[async_trait]
impl ImageGenerator for ReferenceGenerator {
    async fn generate(&mut self, request: GenerationRequest<'_>) -> Result<DynamicImage, ModelError> {
        let weight = request.strength.unwrap_or(POSE_NOISE_WEIGHT).clamp(0.0, 1.0);
        let image = request.image;
        let mut rng = request.generator.clone();

        let (output, rng) = tokio::task::spawn_blocking(move || {
            let output = blend_noise(&image, weight, &mut rng);
            (output, rng)
        })
        .await
        .map_err(join_error)?;

        // The caller's generator advances as if the blend ran in place.
        *request.generator = rng;
        Ok(output)
    }
}

fn blend_noise(image: &DynamicImage, weight: f32, rng: &mut SeedGenerator) -> DynamicImage {
    let source = image.to_rgb8();
    let (width, height) = source.dimensions();

    let mut output = RgbImage::new(width, height);
    for (out, src) in output.pixels_mut().zip(source.pixels()) {
        for channel in 0..3 {
            let noise = f32::from(rng.next_byte());
            let value = f32::from(src.0[channel]);
            out.0[channel] = (value * (1.0 - weight) + noise * weight).round() as u8;
        }
    }

    DynamicImage::ImageRgb8(output)
}
