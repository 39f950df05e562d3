//! Subprocess executor for external command-line tools.
//!
//! Tools are spawned once, their stdout and stderr are read line by line as
//! a stream, and the exit status is reported as the final stream item.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::pin::Pin;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::{Stream, StreamExt};

/// Number of trailing output lines kept for error reports.
pub const DIAGNOSTIC_LINES: usize = 20;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<OsString>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Arguments rendered lossily, for logs and tests.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

/// One item of a running tool's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolEvent {
    Stdout(String),
    Stderr(String),
    /// The process exited. `None` when it was terminated by a signal.
    Exited(Option<i32>),
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Failed to capture {stream} of '{program}'")]
    Capture {
        program: String,
        stream: &'static str,
    },

    #[error("I/O error while reading output of '{program}': {source}")]
    Io {
        program: String,
        source: std::io::Error,
    },

    #[error("'{program}' exited with {}{}", describe_exit(.code), format_diagnostics(.diagnostics))]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        diagnostics: Vec<String>,
    },

    #[error("'{program}' produced no exit status")]
    NoExitStatus { program: String },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

fn format_diagnostics(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!(": {}", lines.join("\n"))
    }
}

/// Output of a successful tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: Vec<String>,
}

/// Executor for external tools.
pub struct ToolExecutor;

impl ToolExecutor {
    /// Spawn `invocation` and stream its output.
    ///
    /// Stdout and stderr lines are interleaved in arrival order. The stream
    /// ends with `ToolEvent::Exited` once the process has exited, or with an
    /// error if the process could not be spawned or waited on. Dropping the
    /// stream kills the child.
    pub fn stream(
        invocation: &ToolInvocation,
    ) -> Pin<Box<dyn Stream<Item = Result<ToolEvent, ToolError>> + Send>> {
        let program = invocation.program.clone();
        let args = invocation.args.clone();

        let stream = async_stream::stream! {
            let mut cmd = Command::new(&program);
            cmd.args(&args);
            cmd.stdin(Stdio::null());
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
            cmd.kill_on_drop(true);
            hide_console_window(&mut cmd);

            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(source) => {
                    yield Err(ToolError::Spawn { program, source });
                    return;
                }
            };

            let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
                (Some(stdout), Some(stderr)) => (stdout, stderr),
                (None, _) => {
                    yield Err(ToolError::Capture { program, stream: "stdout" });
                    return;
                }
                (_, None) => {
                    yield Err(ToolError::Capture { program, stream: "stderr" });
                    return;
                }
            };

            let out = LinesStream::new(BufReader::new(stdout).lines())
                .map(|line| line.map(ToolEvent::Stdout));
            let err = LinesStream::new(BufReader::new(stderr).lines())
                .map(|line| line.map(ToolEvent::Stderr));
            let mut lines = out.merge(err);

            while let Some(line) = lines.next().await {
                match line {
                    Ok(event) => yield Ok(event),
                    Err(source) => {
                        yield Err(ToolError::Io { program: program.clone(), source });
                        return;
                    }
                }
            }

            match child.wait().await {
                Ok(status) => yield Ok(ToolEvent::Exited(status.code())),
                Err(source) => yield Err(ToolError::Io { program, source }),
            }
        };

        Box::pin(stream)
    }

    /// Run `invocation` to completion.
    ///
    /// Stderr lines are logged at debug level and the last
    /// [`DIAGNOSTIC_LINES`] of them are attached to the error when the tool
    /// exits unsuccessfully.
    pub async fn run(invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        tracing::debug!(
            program = %invocation.program,
            args = ?invocation.args_lossy(),
            "Running external tool"
        );

        let mut stream = Self::stream(invocation);
        let mut output = ToolOutput::default();
        let mut diagnostics = VecDeque::with_capacity(DIAGNOSTIC_LINES);

        while let Some(event) = stream.next().await {
            match event? {
                ToolEvent::Stdout(line) => output.stdout.push(line),
                ToolEvent::Stderr(line) => {
                    tracing::debug!(program = %invocation.program, "{line}");
                    if diagnostics.len() == DIAGNOSTIC_LINES {
                        diagnostics.pop_front();
                    }
                    diagnostics.push_back(line);
                }
                ToolEvent::Exited(Some(0)) => return Ok(output),
                ToolEvent::Exited(code) => {
                    return Err(ToolError::NonZeroExit {
                        program: invocation.program.clone(),
                        code,
                        diagnostics: diagnostics.into(),
                    });
                }
            }
        }

        Err(ToolError::NoExitStatus {
            program: invocation.program.clone(),
        })
    }
}

#[cfg(windows)]
fn hide_console_window(cmd: &mut Command) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_cmd: &mut Command) {}
