//! Style preset models for `.vidstyle/styles/*.md`.
//!
//! Styles are Markdown files with YAML front matter. The front matter holds
//! the preset's name and any generation parameters it overrides; the body is
//! the positive prompt.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A named bundle of prompt and generation parameters.
///
/// # Example
///
/// ```markdown
/// ---
/// name: watercolor
/// description: Soft watercolor painting
/// negative-prompt: photo, harsh lines
/// steps: 25
/// denoising-strength: 0.6
/// ---
///
/// watercolor painting, soft pastel palette, paper texture
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct Style {
    /// Identifier used to select the style (`--style <name>`).
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub negative_prompt: Option<String>,

    #[serde(default)]
    pub steps: Option<u32>,

    #[serde(default)]
    pub guidance_scale: Option<f32>,

    #[serde(default)]
    pub denoising_strength: Option<f32>,

    /// The Markdown body, not part of the front matter.
    #[serde(skip)]
    pub prompt: String,
}
