//! Command-line entry point for vidstyle.
//!
//! ```text
//! vidstyle run clip.mp4 --style watercolor
//! vidstyle init
//! vidstyle check
//! vidstyle styles
//! ```

mod reporter;
mod run;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vs_core::config::load_config;
use vs_core::init::{generate_project_structure, InitOptions};
use vs_core::tools::locate;
use vs_protocol::BackendKind;

#[derive(Debug, Parser)]
#[command(
    name = "vidstyle",
    version,
    about = "Restyle a video frame by frame with a diffusion model"
)]
struct Cli {
    /// Increase log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Project root containing the .vidstyle directory.
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Stylize a video.
    Run(run::RunArgs),

    /// Create a .vidstyle directory with default configuration and styles.
    Init {
        /// Overwrite an existing .vidstyle directory.
        #[arg(long)]
        force: bool,

        /// Only write the configuration and one style.
        #[arg(long)]
        minimal: bool,
    },

    /// Report whether the external programs a run needs are installed.
    Check,

    /// List the style presets of the project.
    Styles,
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => run::execute(&cli.project_dir, args).await,
        Commands::Init { force, minimal } => init(cli.project_dir, force, minimal).await,
        Commands::Check => check(&cli.project_dir).await,
        Commands::Styles => styles(&cli.project_dir).await,
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn init(target_dir: PathBuf, force: bool, minimal: bool) -> color_eyre::Result<ExitCode> {
    let written = generate_project_structure(InitOptions {
        target_dir,
        force,
        minimal,
    })
    .await?;

    for path in &written {
        println!("{} {}", "created".green(), path.display());
    }
    Ok(ExitCode::SUCCESS)
}

async fn check(project_dir: &std::path::Path) -> color_eyre::Result<ExitCode> {
    let config = load_config(project_dir).await?.defaults()?;

    let mut required = vec![("video tool", config.tools.ffmpeg.as_str())];
    if config.model.backend == BackendKind::Worker {
        required.push(("inference worker", config.model.worker.program.as_str()));
    }

    let mut missing = 0;
    for (role, program) in required {
        match locate(program) {
            Some(path) => println!("{} {role}: {}", "✓".green(), path.display()),
            None => {
                missing += 1;
                println!("{} {role}: '{program}' not found", "✗".red());
            }
        }
    }

    Ok(if missing == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn styles(project_dir: &std::path::Path) -> color_eyre::Result<ExitCode> {
    let app = load_config(project_dir).await?;

    if app.styles.is_empty() {
        println!("No styles found. Run `vidstyle init` to create the default set.");
    }
    for style in &app.styles {
        println!("{:<16} {}", style.name.bold(), style.description);
    }
    Ok(ExitCode::SUCCESS)
}
