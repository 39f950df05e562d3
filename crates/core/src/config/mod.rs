//! Configuration loading and management.
//!
//! This module provides functionality to load the `.vidstyle/` project
//! directory, standalone run files and style presets, and to layer them into
//! the [`vs_protocol::RunConfig`] of a run.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, PROJECT_DIR};
pub use models::{apply_style, AppConfig};
