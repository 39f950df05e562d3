//! External command-line tools.
//!
//! - [`executor`]: spawning a tool and collecting its output
//! - [`ffmpeg`]: the decode and encode command lines

pub mod executor;
pub mod ffmpeg;

use std::path::PathBuf;

/// Resolve `program` the way a spawn would: paths are checked as given,
/// bare names are searched on `PATH`.
pub fn locate(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}
