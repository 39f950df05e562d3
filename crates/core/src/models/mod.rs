//! Model collaborators used by the pose and stylize stages.
//!
//! - [`base`]: the collaborator traits and request types
//! - [`seed`]: the per-frame seeded generator
//! - [`factory`]: backend selection from the run configuration
//! - [`adapters`]: the worker-process and reference backends

pub mod adapters;
pub mod base;
pub mod factory;
pub mod seed;

pub use base::{
    Conditioning, DeviceResident, GenerationRequest, GeneratorSpec, ImageGenerator, ModelError,
    ModelLoader, PoseEstimator,
};
pub use factory::ModelFactory;
pub use seed::SeedGenerator;
