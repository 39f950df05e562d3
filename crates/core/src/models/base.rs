//! Model collaborator traits and supporting types.
//!
//! The pipeline never loads or runs a model itself. It asks a
//! [`ModelLoader`] for a handle at stage entry, drives the handle one frame
//! at a time and releases it at stage exit.

use crate::models::seed::SeedGenerator;
use async_trait::async_trait;
use image::DynamicImage;
use thiserror::Error;
use vs_protocol::{ModelSelection, PerformanceFlags, RunConfig};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to load model '{model}': {reason}")]
    Load { model: String, reason: String },

    #[error("{0}")]
    Inference(String),

    #[error("Worker protocol error: {0}")]
    Protocol(String),

    #[error("Image I/O error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How the generative model is steered for every frame of a run.
///
/// Resolved once from the run configuration and passed down unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conditioning {
    /// Generate from the frame's pose image through a pose control network.
    PoseConditioned,

    /// Regenerate the raw frame. `strength` is the denoising strength in [0, 1].
    ImageToImage { strength: f32 },
}

impl Conditioning {
    pub fn from_config(config: &RunConfig) -> Self {
        if config.pose_mode {
            Self::PoseConditioned
        } else {
            Self::ImageToImage {
                strength: config.denoising_strength,
            }
        }
    }

    /// Denoising strength, present only in image-to-image mode.
    pub fn strength(self) -> Option<f32> {
        match self {
            Self::PoseConditioned => None,
            Self::ImageToImage { strength } => Some(strength),
        }
    }

    pub fn is_pose_conditioned(self) -> bool {
        matches!(self, Self::PoseConditioned)
    }
}

/// Everything a backend needs to instantiate a generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSpec {
    pub selection: ModelSelection,
    pub performance: PerformanceFlags,
    pub conditioning: Conditioning,
}

impl GeneratorSpec {
    pub fn new(config: &RunConfig, conditioning: Conditioning) -> Self {
        Self {
            selection: config.model.clone(),
            performance: config.performance.clone(),
            conditioning,
        }
    }
}

/// Inputs of a single generation call.
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    pub negative_prompt: &'a str,
    /// Pose image or raw frame, depending on the conditioning mode.
    pub image: DynamicImage,
    pub steps: u32,
    pub guidance_scale: f32,
    pub generator: &'a mut SeedGenerator,
    /// Only set in image-to-image mode.
    pub strength: Option<f32>,
}

/// A model holding memory on the inference device.
#[async_trait]
pub trait DeviceResident: Send {
    /// Drop cached device allocations. Called between frames.
    async fn clear_cache(&mut self) -> Result<(), ModelError> {
        Ok(())
    }

    /// Free the model and everything it holds on the device. The handle is
    /// not used again afterwards.
    async fn release(&mut self) -> Result<(), ModelError> {
        Ok(())
    }
}

#[async_trait]
pub trait PoseEstimator: DeviceResident {
    /// Render a skeleton overlay for one frame.
    async fn estimate(&mut self, frame: DynamicImage) -> Result<DynamicImage, ModelError>;
}

#[async_trait]
pub trait ImageGenerator: DeviceResident {
    async fn generate(&mut self, request: GenerationRequest<'_>) -> Result<DynamicImage, ModelError>;
}

/// Instantiates model handles. Loading is never retried.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load_pose_estimator(
        &self,
        selection: &ModelSelection,
    ) -> Result<Box<dyn PoseEstimator>, ModelError>;

    async fn load_generator(
        &self,
        spec: &GeneratorSpec,
    ) -> Result<Box<dyn ImageGenerator>, ModelError>;
}
