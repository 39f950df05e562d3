//! Run configuration models for `.vidstyle/config.toml` and standalone run files.
//!
//! A `RunConfig` is immutable for the duration of a run: the caller builds it,
//! hands it to the pipeline, and the pipeline only ever reads it. Every field
//! has a default so partial configuration files are valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use ts_rs::TS;

/// Complete description of one stylization run.
///
/// # Example
///
/// ```toml
/// # .vidstyle/config.toml
/// input-video = "clips/dance.mp4"
/// output-dir = "output"
/// target-fps = 24
/// target-width = 512
/// pose-mode = true
/// seed = 12345
///
/// [model]
/// backend = "worker"
/// weights = "models/anything-v5.safetensors"
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(default, rename_all = "kebab-case")]
pub struct RunConfig {
    /// Source video to decompose.
    pub input_video: PathBuf,

    /// Root of the run workspace. Transient frames live below it and the
    /// stylized frames plus the final video are written into it.
    pub output_dir: PathBuf,

    /// Frame rate used both for resampling the input and for encoding the output.
    pub target_fps: u32,

    /// Width of the extracted frames in pixels; height follows the aspect ratio.
    pub target_width: u32,

    /// Skeleton-guided generation when true, image-to-image otherwise.
    pub pose_mode: bool,

    /// Which models and backend to use.
    pub model: ModelSelection,

    /// Positive prompt.
    pub prompt: String,

    /// Negative prompt.
    pub negative_prompt: String,

    /// Seed the per-frame generator is reset to before every frame.
    #[ts(type = "number")]
    pub seed: u64,

    /// Number of denoising steps per frame.
    pub steps: u32,

    /// Classifier-free guidance scale.
    pub guidance_scale: f32,

    /// How much of the source frame is regenerated (0 = unchanged, 1 = fully).
    ///
    /// Only meaningful in image-to-image mode; ignored when `pose_mode` is set.
    pub denoising_strength: f32,

    /// Memory and speed trade-offs forwarded to the generative backend.
    pub performance: PerformanceFlags,

    /// External decode/encode tool settings.
    pub tools: ToolConfig,

    /// Names used inside `output_dir`.
    pub workspace: WorkspaceLayout,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_video: PathBuf::new(),
            output_dir: PathBuf::from("output"),
            target_fps: 24,
            target_width: 512,
            pose_mode: true,
            model: ModelSelection::default(),
            prompt: "high quality, masterpiece, anime style, 1girl, vivid colors".to_string(),
            negative_prompt: "low quality, bad anatomy, watermark, text, error, ugly, deformed"
                .to_string(),
            seed: 12345,
            steps: 20,
            guidance_scale: 7.5,
            denoising_strength: 0.75,
            performance: PerformanceFlags::default(),
            tools: ToolConfig::default(),
            workspace: WorkspaceLayout::default(),
        }
    }
}

/// Inference backend used for the pose and generation stages.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// External inference worker process speaking NDJSON over stdio.
    #[default]
    Worker,

    /// Deterministic CPU stand-in, useful for dry runs.
    Reference,
}

/// Model weights and identifiers handed to the backend at load time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(default, rename_all = "kebab-case")]
pub struct ModelSelection {
    pub backend: BackendKind,

    /// Single-file checkpoint (`.safetensors`). When absent the backend loads
    /// `base_model` from its own model hub.
    pub weights: Option<PathBuf>,

    /// Original model config accompanying a single-file checkpoint.
    pub original_config: PathBuf,

    pub base_model: String,

    pub controlnet_model: String,

    /// Identifier of the pose-estimation model.
    pub pose_model: String,

    /// Command line that starts the inference worker.
    pub worker: WorkerCommand,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            weights: None,
            original_config: PathBuf::from("configs/v1-inference.yaml"),
            base_model: "runwayml/stable-diffusion-v1-5".to_string(),
            controlnet_model: "lllyasviel/sd-controlnet-openpose".to_string(),
            pose_model: "lllyasviel/ControlNet".to_string(),
            worker: WorkerCommand::default(),
        }
    }
}

/// Program and arguments used to spawn the inference worker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for WorkerCommand {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["-m".to_string(), "vidstyle_worker".to_string()],
        }
    }
}

/// Attention optimization the backend may enable.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub enum AttentionBackend {
    Xformers,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, TS)]
#[serde(default, rename_all = "kebab-case")]
pub struct PerformanceFlags {
    /// Offload model components to host memory between uses.
    pub low_vram: bool,

    pub attention: Option<AttentionBackend>,
}

/// Decode/encode tool settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default, rename_all = "kebab-case")]
pub struct ToolConfig {
    /// Program used for both decoding and encoding.
    pub ffmpeg: String,

    /// Video codec passed to the encoder.
    pub video_codec: String,

    /// JPEG quality scale for extracted frames (2 is near-lossless, 31 is worst).
    pub frame_quality: u8,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            video_codec: "libx264".to_string(),
            frame_quality: 2,
        }
    }
}

/// File and directory names inside the output directory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default, rename_all = "kebab-case")]
pub struct WorkspaceLayout {
    /// Transient subtree holding raw and pose frames; removed after every run.
    pub transient_dir: String,

    /// Persistent directory receiving the stylized frames.
    pub frames_dir: String,

    /// File name of the assembled video.
    pub video_file: String,

    /// Image extension shared by every frame directory.
    pub frame_extension: String,
}

impl Default for WorkspaceLayout {
    fn default() -> Self {
        Self {
            transient_dir: "temp".to_string(),
            frames_dir: "frames_out".to_string(),
            video_file: "final_output.mp4".to_string(),
            frame_extension: "jpg".to_string(),
        }
    }
}
