//! Mock model implementations for deterministic testing.

use async_trait::async_trait;
use image::DynamicImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use vs_core::models::{
    DeviceResident, GenerationRequest, GeneratorSpec, ImageGenerator, ModelError, ModelLoader,
    PoseEstimator,
};
use vs_protocol::ModelSelection;

/// What the mock models observed.
#[derive(Default)]
pub struct ModelStats {
    pub pose_loads: AtomicUsize,
    pub generator_loads: AtomicUsize,
    pub releases: AtomicUsize,
    pub cache_clears: AtomicUsize,
    pub estimated: AtomicUsize,
    /// First value drawn from the seeded generator on every call.
    pub draws: Mutex<Vec<u64>>,
    pub strengths: Mutex<Vec<Option<f32>>>,
}

impl ModelStats {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        Self::count(&self.pose_loads) + Self::count(&self.generator_loads)
    }
}

/// Returns a flat grey image of the frame's size.
pub struct SolidPoseEstimator {
    stats: Arc<ModelStats>,
    /// Cancel the token while handling this 1-based call.
    cancel_after: Option<(usize, CancellationToken)>,
    calls: usize,
}

#[async_trait]
impl DeviceResident for SolidPoseEstimator {
    async fn release(&mut self) -> Result<(), ModelError> {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl PoseEstimator for SolidPoseEstimator {
    async fn estimate(&mut self, frame: DynamicImage) -> Result<DynamicImage, ModelError> {
        self.calls += 1;
        self.stats.estimated.fetch_add(1, Ordering::SeqCst);

        if let Some((after, token)) = &self.cancel_after {
            if *after == self.calls {
                token.cancel();
            }
        }

        let pose = image::RgbImage::from_pixel(frame.width(), frame.height(), image::Rgb([90, 90, 90]));
        Ok(DynamicImage::ImageRgb8(pose))
    }
}

/// Inverts its input and records the seeded draws it sees.
pub struct RecordingGenerator {
    stats: Arc<ModelStats>,
    behavior: GeneratorBehavior,
    calls: usize,
}

#[async_trait]
impl DeviceResident for RecordingGenerator {
    async fn clear_cache(&mut self) -> Result<(), ModelError> {
        self.stats.cache_clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn release(&mut self) -> Result<(), ModelError> {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ImageGenerator for RecordingGenerator {
    async fn generate(&mut self, request: GenerationRequest<'_>) -> Result<DynamicImage, ModelError> {
        self.calls += 1;

        if self.behavior.fail_on == Some(self.calls) {
            return Err(ModelError::Inference("CUDA out of memory".to_string()));
        }
        if self.behavior.panic_on == Some(self.calls) {
            panic!("generator state corrupted on call {}", self.calls);
        }

        self.stats
            .draws
            .lock()
            .unwrap()
            .push(request.generator.next_u64());
        self.stats.strengths.lock().unwrap().push(request.strength);

        if let Some((after, token)) = &self.behavior.cancel_after {
            if *after == self.calls {
                token.cancel();
            }
        }

        let mut image = request.image;
        image.invert();
        Ok(image)
    }
}

/// Failure and cancellation hooks of the generator.
#[derive(Clone, Default)]
pub struct GeneratorBehavior {
    /// 1-based call that fails with an inference error.
    pub fail_on: Option<usize>,
    /// 1-based call that panics.
    pub panic_on: Option<usize>,
    /// Cancel the token while handling this 1-based call.
    pub cancel_after: Option<(usize, CancellationToken)>,
}

/// Loader handing out the mock models.
#[derive(Clone, Default)]
pub struct MockLoader {
    pub stats: Arc<ModelStats>,
    pub behavior: GeneratorBehavior,
    /// Make loading the generative model fail.
    pub fail_generator_load: bool,
    /// Cancel the token while the pose estimator handles this 1-based call.
    pub pose_cancel_after: Option<(usize, CancellationToken)>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn with_behavior(behavior: GeneratorBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ModelLoader for MockLoader {
    async fn load_pose_estimator(
        &self,
        _selection: &ModelSelection,
    ) -> Result<Box<dyn PoseEstimator>, ModelError> {
        self.stats.pose_loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SolidPoseEstimator {
            stats: Arc::clone(&self.stats),
            cancel_after: self.pose_cancel_after.clone(),
            calls: 0,
        }))
    }

    async fn load_generator(
        &self,
        _spec: &GeneratorSpec,
    ) -> Result<Box<dyn ImageGenerator>, ModelError> {
        self.stats.generator_loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_generator_load {
            return Err(ModelError::Load {
                model: "anything-v5".to_string(),
                reason: "weights file is truncated".to_string(),
            });
        }
        Ok(Box::new(RecordingGenerator {
            stats: Arc::clone(&self.stats),
            behavior: self.behavior.clone(),
            calls: 0,
        }))
    }
}
