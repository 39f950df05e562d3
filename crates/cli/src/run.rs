//! The `run` command.

use crate::reporter::Reporter;
use clap::{Args, ValueEnum};
use color_eyre::eyre::eyre;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use vs_core::config::load_config;
use vs_core::models::ModelFactory;
use vs_core::state::RunManager;
use vs_protocol::{AttentionBackend, BackendKind, RunConfig, RunDisposition};

/// Exit status of a run stopped with Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Input video. Overrides `input-video` from the configuration.
    pub input: Option<PathBuf>,

    /// Run configuration file (.toml, .yaml or .yml) layered over the
    /// project configuration.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Style preset from .vidstyle/styles.
    #[arg(short, long)]
    pub style: Option<String>,

    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub fps: Option<u32>,

    #[arg(long)]
    pub width: Option<u32>,

    /// Regenerate the raw frames instead of generating from poses.
    #[arg(long)]
    pub img2img: bool,

    /// Denoising strength in image-to-image mode, between 0 and 1.
    #[arg(long)]
    pub strength: Option<f32>,

    #[arg(long)]
    pub prompt: Option<String>,

    #[arg(long)]
    pub negative_prompt: Option<String>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub steps: Option<u32>,

    #[arg(long)]
    pub guidance_scale: Option<f32>,

    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Single-file model checkpoint (.safetensors).
    #[arg(long)]
    pub weights: Option<PathBuf>,

    /// Offload model components to host memory between uses.
    #[arg(long)]
    pub low_vram: bool,

    /// Enable xformers memory-efficient attention.
    #[arg(long)]
    pub xformers: bool,

    /// Print events as JSON lines on stdout instead of a progress bar.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Backend {
    Worker,
    Reference,
}

impl From<Backend> for BackendKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Worker => BackendKind::Worker,
            Backend::Reference => BackendKind::Reference,
        }
    }
}

impl RunArgs {
    /// Apply the command-line flags, the highest-precedence layer.
    fn apply(&self, config: &mut RunConfig) {
        if let Some(input) = &self.input {
            config.input_video = input.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(fps) = self.fps {
            config.target_fps = fps;
        }
        if let Some(width) = self.width {
            config.target_width = width;
        }
        if self.img2img {
            config.pose_mode = false;
        }
        if let Some(strength) = self.strength {
            config.denoising_strength = strength;
        }
        if let Some(prompt) = &self.prompt {
            config.prompt = prompt.clone();
        }
        if let Some(negative_prompt) = &self.negative_prompt {
            config.negative_prompt = negative_prompt.clone();
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(steps) = self.steps {
            config.steps = steps;
        }
        if let Some(guidance_scale) = self.guidance_scale {
            config.guidance_scale = guidance_scale;
        }
        if let Some(backend) = self.backend {
            config.model.backend = backend.into();
        }
        if let Some(weights) = &self.weights {
            config.model.weights = Some(weights.clone());
        }
        if self.low_vram {
            config.performance.low_vram = true;
        }
        if self.xformers {
            config.performance.attention = Some(AttentionBackend::Xformers);
        }
    }
}

/// Resolve the configuration, start the run and follow it to the end.
///
/// Ctrl-C requests cancellation once; the run then stops at the next frame
/// boundary and cleans up before this returns.
pub async fn execute(project_dir: &Path, args: RunArgs) -> color_eyre::Result<ExitCode> {
    let app = load_config(project_dir).await?;
    let mut config = app.resolve(args.config.as_deref(), args.style.as_deref())?;
    args.apply(&mut config);

    tracing::debug!(?config, "Resolved run configuration");

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let manager = RunManager::new(Arc::new(ModelFactory), events_tx);
    let mut reporter = Reporter::new(args.json)?;

    let run_id = manager.start_run(config).await;
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = events_rx.recv() => match event {
                Some(event) => {
                    let terminal = event.is_terminal();
                    reporter.handle(&event)?;
                    if terminal {
                        break;
                    }
                }
                None => break,
            },
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                signal?;
                interrupted = true;
                reporter.note("Cancelling after the current frame...");
                manager
                    .cancel_run(run_id)
                    .await
                    .map_err(|e| eyre!("{e:#}"))?;
            }
        }
    }

    let disposition = manager
        .wait_run(run_id)
        .await
        .map_err(|e| eyre!("{e:#}"))?;

    match disposition {
        RunDisposition::Completed { .. } => Ok(ExitCode::SUCCESS),
        RunDisposition::Cancelled => Ok(ExitCode::from(EXIT_CANCELLED)),
        RunDisposition::Failed { reason } => {
            if args.json {
                Ok(ExitCode::FAILURE)
            } else {
                Err(eyre!(reason))
            }
        }
    }
}
