//! Rendering of run events on the terminal.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use vs_protocol::Event;

const BAR_TEMPLATE: &str = "{prefix:>9.bold} [{bar:40.cyan/blue}] {pos:>3}% {msg}";

/// Shows a run either as a progress bar on stderr or as JSON lines on stdout.
pub enum Reporter {
    Bar(ProgressBar),
    Json,
}

impl Reporter {
    pub fn new(json: bool) -> color_eyre::Result<Self> {
        if json {
            return Ok(Self::Json);
        }

        let bar = ProgressBar::new(100);
        bar.set_style(ProgressStyle::with_template(BAR_TEMPLATE)?.progress_chars("=> "));
        Ok(Self::Bar(bar))
    }

    pub fn handle(&mut self, event: &Event) -> color_eyre::Result<()> {
        match self {
            Self::Json => println!("{}", serde_json::to_string(event)?),
            Self::Bar(bar) => render(bar, event),
        }
        Ok(())
    }

    /// A message outside the event stream.
    pub fn note(&self, message: &str) {
        match self {
            Self::Json => eprintln!("{message}"),
            Self::Bar(bar) => bar.println(message.yellow().to_string()),
        }
    }
}

fn render(bar: &ProgressBar, event: &Event) {
    match event {
        Event::RunStarted { input_video, .. } => {
            bar.println(format!("Stylizing {}", input_video.display()));
        }
        Event::StageStarted { stage, .. } => bar.set_prefix(stage.label()),
        Event::Progress {
            percent, status, ..
        } => {
            bar.set_position(u64::from(*percent));
            bar.set_message(status.clone());
        }
        Event::RunCompleted {
            final_video,
            frame_count,
            ..
        } => {
            bar.finish_and_clear();
            println!(
                "{} Stylized {frame_count} frames into {}",
                "✓".green(),
                final_video.display()
            );
        }
        Event::RunCancelled { .. } => {
            bar.abandon();
            eprintln!("{} Run cancelled", "✗".yellow());
        }
        Event::RunError { .. } => bar.abandon(),
    }
}
