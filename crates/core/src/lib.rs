//! # vs-core
//!
//! Frame pipeline engine and model collaborators for vidstyle.
//!
//! This crate provides:
//! - Configuration loading from the `.vidstyle/` directory
//! - The stylization pipeline: extract, pose, stylize, assemble
//! - Model traits plus a worker-process and a reference backend
//! - Run state tracking and cancellation
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and layering
//! - [`engine`]: Pipeline execution engine and run workspace
//! - [`frames`]: Frame identifiers and frame sequences
//! - [`init`]: `.vidstyle/` scaffolding
//! - [`models`]: Pose estimator and image generator abstractions
//! - [`stages`]: The individual pipeline stages
//! - [`state`]: Run state management
//! - [`tools`]: External tool invocation (ffmpeg)

pub mod config;
pub mod engine;
pub mod frames;
pub mod init;
pub mod models;
pub mod stages;
pub mod state;
pub mod tools;
