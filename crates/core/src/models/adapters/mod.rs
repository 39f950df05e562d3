//! Model backends.

pub mod reference;
pub mod worker;

pub use reference::{ReferenceGenerator, ReferencePoseEstimator};
pub use worker::{WorkerGenerator, WorkerPoseEstimator};
