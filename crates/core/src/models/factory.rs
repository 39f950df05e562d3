//! Backend selection.

use crate::models::adapters::{
    ReferenceGenerator, ReferencePoseEstimator, WorkerGenerator, WorkerPoseEstimator,
};
use crate::models::base::{GeneratorSpec, ImageGenerator, ModelError, ModelLoader, PoseEstimator};
use async_trait::async_trait;
use vs_protocol::{BackendKind, ModelSelection};

/// Loads models with the backend named in the model selection.
///
/// - `BackendKind::Worker` → [`WorkerPoseEstimator`] / [`WorkerGenerator`]
/// - `BackendKind::Reference` → [`ReferencePoseEstimator`] / [`ReferenceGenerator`]
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelFactory;

#[async_trait]
impl ModelLoader for ModelFactory {
    async fn load_pose_estimator(
        &self,
        selection: &ModelSelection,
    ) -> Result<Box<dyn PoseEstimator>, ModelError> {
        tracing::debug!(backend = ?selection.backend, model = %selection.pose_model, "Loading pose estimator");
        match selection.backend {
            BackendKind::Worker => Ok(Box::new(WorkerPoseEstimator::load(selection).await?)),
            BackendKind::Reference => Ok(Box::new(ReferencePoseEstimator::new())),
        }
    }

    async fn load_generator(
        &self,
        spec: &GeneratorSpec,
    ) -> Result<Box<dyn ImageGenerator>, ModelError> {
        tracing::debug!(
            backend = ?spec.selection.backend,
            conditioning = ?spec.conditioning,
            "Loading generator"
        );
        match spec.selection.backend {
            BackendKind::Worker => Ok(Box::new(WorkerGenerator::load(spec).await?)),
            BackendKind::Reference => Ok(Box::new(ReferenceGenerator::new())),
        }
    }
}
