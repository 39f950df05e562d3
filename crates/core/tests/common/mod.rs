//! Common test utilities shared by the integration tests.
//!
//! - Fixtures: a workspace with an input clip and a scripted ffmpeg stand-in
//! - Mock models with load/release accounting
//! - Event assertions

pub mod assertions;
pub mod fixtures;
pub mod mock_models;

#[allow(unused_imports)]
pub use assertions::*;
pub use fixtures::*;
#[allow(unused_imports)]
pub use mock_models::*;
