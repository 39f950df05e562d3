//! State management for stylization runs.
//!
//! This module provides:
//! - The run state machine and event emission ([`run`])
//! - RunManager for coordinating runs on background tasks ([`manager`])

pub mod manager;
pub mod run;

pub use manager::RunManager;
pub use run::RunTracker;
