//! # vs-protocol
//!
//! Shared data models for vidstyle.
//!
//! This crate defines the structures exchanged between the pipeline and its
//! callers:
//! - Run configuration (`.vidstyle/config.toml`, standalone run files)
//! - Style presets (`.vidstyle/styles/*.md`)
//! - Runtime run state and terminal dispositions
//! - Progress events sent from the pipeline to the caller
//!
//! ## Modules
//!
//! - [`config_models`]: Run configuration
//! - [`style_models`]: Style presets
//! - [`run_models`]: Run state, stages and dispositions
//! - [`ipc`]: Events emitted by a running pipeline
//!
//! ## Design Principles
//!
//! - Minimal dependencies: only serde, ts-rs, uuid and chrono
//! - TypeScript generation: all types derive `TS` for frontend compatibility
//! - Independent compilation: no dependencies on other vidstyle crates

pub mod config_models;
pub mod ipc;
pub mod run_models;
pub mod style_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use ipc::*;
pub use run_models::*;
pub use style_models::*;
