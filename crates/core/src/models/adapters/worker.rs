//! Inference worker adapter.
//!
//! The worker is an external process that owns the inference runtime. The
//! adapter spawns one worker per model handle and talks to it with one JSON
//! object per line on stdin and stdout:
//!
//! ```text
//! -> {"op":"load","role":"generator","conditioning":"pose","selection":{..},"performance":{..}}
//! <- {"ok":true}
//! -> {"op":"generate","input":"/tmp/.../in_1.png","output":"/tmp/.../out_1.png","seed":12345,..}
//! <- {"ok":false,"error":"CUDA out of memory"}
//! ```
//!
//! Images travel as PNG files in a scratch directory private to the adapter.
//! Anything the worker writes to stderr is forwarded to the debug log.

use crate::frames::{load_frame, save_frame};
use crate::models::base::{
    Conditioning, DeviceResident, GenerationRequest, GeneratorSpec, ImageGenerator, ModelError,
    PoseEstimator,
};
use crate::tools::locate;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use vs_protocol::{ModelSelection, PerformanceFlags, WorkerCommand};

#[derive(Serialize, Debug)]
#[serde(rename_all = "snake_case")]
enum ModelRole {
    Pose,
    Generator,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "snake_case")]
enum ConditioningKind {
    Pose,
    Img2img,
}

impl From<Conditioning> for ConditioningKind {
    fn from(conditioning: Conditioning) -> Self {
        match conditioning {
            Conditioning::PoseConditioned => Self::Pose,
            Conditioning::ImageToImage { .. } => Self::Img2img,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(tag = "op", rename_all = "snake_case")]
enum WorkerRequest<'a> {
    Load {
        role: ModelRole,
        #[serde(skip_serializing_if = "Option::is_none")]
        conditioning: Option<ConditioningKind>,
        selection: &'a ModelSelection,
        #[serde(skip_serializing_if = "Option::is_none")]
        performance: Option<&'a PerformanceFlags>,
    },
    EstimatePose {
        input: &'a Path,
        output: &'a Path,
    },
    Generate {
        prompt: &'a str,
        negative_prompt: &'a str,
        input: &'a Path,
        output: &'a Path,
        steps: u32,
        guidance_scale: f32,
        seed: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        strength: Option<f32>,
    },
    EmptyCache,
    Release,
}

#[derive(Deserialize, Debug)]
struct WorkerResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// A running worker process.
struct WorkerProcess {
    program: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    scratch: TempDir,
    calls: u64,
}

impl WorkerProcess {
    /// Spawn the worker and ask it to load a model.
    async fn start(
        command: &WorkerCommand,
        model: &str,
        request: WorkerRequest<'_>,
    ) -> Result<Self, ModelError> {
        let load_error = |reason: String| ModelError::Load {
            model: model.to_string(),
            reason,
        };

        if locate(&command.program).is_none() {
            return Err(load_error(format!(
                "worker program '{}' was not found",
                command.program
            )));
        }

        let scratch = tempfile::Builder::new()
            .prefix("vidstyle-worker-")
            .tempdir()
            .map_err(|e| load_error(format!("failed to create scratch directory: {e}")))?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| load_error(format!("failed to spawn '{}': {e}", command.program)))?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| load_error("worker stdout unavailable".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            let program = command.program.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(worker = %program, "{line}");
                }
            });
        }

        let mut process = Self {
            program: command.program.clone(),
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            scratch,
            calls: 0,
        };

        process
            .call(&request)
            .await
            .map_err(|e| load_error(e.to_string()))?;

        tracing::info!(worker = %process.program, model, "Worker loaded model");
        Ok(process)
    }

    /// Send one request and wait for its response.
    ///
    /// Transport problems are `Protocol` errors; a response with `ok: false`
    /// is an `Inference` error carrying the worker's message.
    async fn call(&mut self, request: &WorkerRequest<'_>) -> Result<(), ModelError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ModelError::Protocol("worker has been released".to_string()))?;

        let mut line = serde_json::to_string(request)
            .map_err(|e| ModelError::Protocol(format!("failed to encode request: {e}")))?;
        line.push('\n');

        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ModelError::Protocol(format!("failed to write to worker: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| ModelError::Protocol(format!("failed to write to worker: {e}")))?;

        let reply = self
            .stdout
            .next_line()
            .await
            .map_err(|e| ModelError::Protocol(format!("failed to read from worker: {e}")))?
            .ok_or_else(|| ModelError::Protocol("worker exited unexpectedly".to_string()))?;

        let response: WorkerResponse = serde_json::from_str(&reply)
            .map_err(|e| ModelError::Protocol(format!("invalid response '{reply}': {e}")))?;

        if response.ok {
            Ok(())
        } else {
            Err(ModelError::Inference(
                response
                    .error
                    .unwrap_or_else(|| "worker reported an unspecified error".to_string()),
            ))
        }
    }

    /// Fresh input/output file pair in the scratch directory.
    fn scratch_pair(&mut self) -> (PathBuf, PathBuf) {
        self.calls += 1;
        let dir = self.scratch.path();
        (
            dir.join(format!("in_{}.png", self.calls)),
            dir.join(format!("out_{}.png", self.calls)),
        )
    }

    async fn release(&mut self) -> Result<(), ModelError> {
        if self.stdin.is_none() {
            return Ok(());
        }

        let result = self.call(&WorkerRequest::Release).await;

        // Closing stdin tells the worker to exit.
        self.stdin = None;
        match self.child.wait().await {
            Ok(status) if !status.success() => {
                tracing::warn!(worker = %self.program, %status, "Worker exited unsuccessfully");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(worker = %self.program, error = %e, "Failed to wait for worker");
            }
        }

        result
    }

    /// Write `image` into the scratch directory. Returns the input path
    /// and the path the worker should write its result to.
    async fn stage_input(
        &mut self,
        image: image::DynamicImage,
    ) -> Result<(PathBuf, PathBuf), ModelError> {
        let (input, output) = self.scratch_pair();
        save_frame(image, input.clone()).await?;
        Ok((input, output))
    }

    /// Read the worker's result and clear both scratch files.
    async fn collect_output(
        input: PathBuf,
        output: PathBuf,
    ) -> Result<image::DynamicImage, ModelError> {
        let result = load_frame(output.clone()).await?;
        let _ = tokio::fs::remove_file(&input).await;
        let _ = tokio::fs::remove_file(&output).await;
        Ok(result)
    }
}

/// Pose estimator backed by a worker process.
pub struct WorkerPoseEstimator {
    process: WorkerProcess,
}

impl WorkerPoseEstimator {
    pub async fn load(selection: &ModelSelection) -> Result<Self, ModelError> {
        let request = WorkerRequest::Load {
            role: ModelRole::Pose,
            conditioning: None,
            selection,
            performance: None,
        };
        let process = WorkerProcess::start(&selection.worker, &selection.pose_model, request).await?;
        Ok(Self { process })
    }
}

#[async_trait]
impl DeviceResident for WorkerPoseEstimator {
    async fn clear_cache(&mut self) -> Result<(), ModelError> {
        self.process.call(&WorkerRequest::EmptyCache).await
    }

    async fn release(&mut self) -> Result<(), ModelError> {
        self.process.release().await
    }
}

#[async_trait]
impl PoseEstimator for WorkerPoseEstimator {
    async fn estimate(&mut self, frame: image::DynamicImage) -> Result<image::DynamicImage, ModelError> {
        let (input, output) = self.process.stage_input(frame).await?;
        self.process
            .call(&WorkerRequest::EstimatePose {
                input: &input,
                output: &output,
            })
            .await?;
        WorkerProcess::collect_output(input, output).await
    }
}

/// Generative model backed by a worker process.
pub struct WorkerGenerator {
    process: WorkerProcess,
}

impl WorkerGenerator {
    pub async fn load(spec: &GeneratorSpec) -> Result<Self, ModelError> {
        let request = WorkerRequest::Load {
            role: ModelRole::Generator,
            conditioning: Some(spec.conditioning.into()),
            selection: &spec.selection,
            performance: Some(&spec.performance),
        };
        let model = spec
            .selection
            .weights
            .as_ref()
            .map(|weights| weights.display().to_string())
            .unwrap_or_else(|| spec.selection.base_model.clone());
        let process = WorkerProcess::start(&spec.selection.worker, &model, request).await?;
        Ok(Self { process })
    }
}

#[async_trait]
impl DeviceResident for WorkerGenerator {
    async fn clear_cache(&mut self) -> Result<(), ModelError> {
        self.process.call(&WorkerRequest::EmptyCache).await
    }

    async fn release(&mut self) -> Result<(), ModelError> {
        self.process.release().await
    }
}

#[async_trait]
impl ImageGenerator for WorkerGenerator {
    async fn generate(&mut self, request: GenerationRequest<'_>) -> Result<image::DynamicImage, ModelError> {
        let GenerationRequest {
            prompt,
            negative_prompt,
            image,
            steps,
            guidance_scale,
            generator,
            strength,
        } = request;
        let (input, output) = self.process.stage_input(image).await?;
        self.process
            .call(&WorkerRequest::Generate {
                prompt,
                negative_prompt,
                input: &input,
                output: &output,
                steps,
                guidance_scale,
                seed: generator.seed(),
                strength,
            })
            .await?;
        WorkerProcess::collect_output(input, output).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = WorkerRequest::Generate {
            prompt: "anime",
            negative_prompt: "blurry",
            input: Path::new("in_1.png"),
            output: Path::new("out_1.png"),
            steps: 20,
            guidance_scale: 7.5,
            seed: 12345,
            strength: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["op"], "generate");
        assert_eq!(json["seed"], 12345);
        assert!(json.get("strength").is_none());

        let json = serde_json::to_value(WorkerRequest::EmptyCache).unwrap();
        assert_eq!(json, serde_json::json!({"op": "empty_cache"}));
    }

    #[test]
    fn test_load_request_carries_selection() {
        let selection = ModelSelection::default();
        let performance = PerformanceFlags::default();
        let request = WorkerRequest::Load {
            role: ModelRole::Generator,
            conditioning: Some(Conditioning::ImageToImage { strength: 0.5 }.into()),
            selection: &selection,
            performance: Some(&performance),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["op"], "load");
        assert_eq!(json["role"], "generator");
        assert_eq!(json["conditioning"], "img2img");
        assert_eq!(json["selection"]["base-model"], "runwayml/stable-diffusion-v1-5");
    }

    #[tokio::test]
    async fn test_missing_worker_program_is_load_failure() {
        let mut selection = ModelSelection::default();
        selection.worker.program = "vidstyle-no-such-worker-xyz".to_string();

        let result = WorkerPoseEstimator::load(&selection).await;
        assert!(matches!(result, Err(ModelError::Load { .. })));
    }

    /// Worker that answers every request with `ok` and copies the input
    /// image to the output path.
    #[cfg(unix)]
    fn echo_worker(dir: &Path) -> WorkerCommand {
        let script = r#"while IFS= read -r line; do
  input=$(printf '%s' "$line" | sed -n 's/.*"input":"\([^"]*\)".*/\1/p')
  output=$(printf '%s' "$line" | sed -n 's/.*"output":"\([^"]*\)".*/\1/p')
  if [ -n "$input" ]; then cp "$input" "$output"; fi
  echo '{"ok":true}'
done
"#;
        let path = dir.join("worker.sh");
        std::fs::write(&path, script).unwrap();
        WorkerCommand {
            program: "sh".to_string(),
            args: vec![path.display().to_string()],
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let selection = ModelSelection {
            worker: echo_worker(dir.path()),
            ..ModelSelection::default()
        };

        let mut estimator = WorkerPoseEstimator::load(&selection).await.unwrap();
        let frame = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            6,
            4,
            image::Rgb([1, 2, 3]),
        ));

        let pose = estimator.estimate(frame).await.unwrap();
        assert_eq!((pose.width(), pose.height()), (6, 4));
        assert_eq!(pose.to_rgb8().get_pixel(0, 0).0, [1, 2, 3]);

        estimator.clear_cache().await.unwrap();
        estimator.release().await.unwrap();
        assert!(matches!(
            estimator.estimate(image::DynamicImage::new_rgb8(1, 1)).await,
            Err(ModelError::Protocol(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_error_response_is_inference_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worker.sh");
        std::fs::write(
            &path,
            r#"read -r line; echo '{"ok":true}'
read -r line; echo '{"ok":false,"error":"CUDA out of memory"}'
"#,
        )
        .unwrap();
        let spec = GeneratorSpec {
            selection: ModelSelection {
                worker: WorkerCommand {
                    program: "sh".to_string(),
                    args: vec![path.display().to_string()],
                },
                ..ModelSelection::default()
            },
            performance: PerformanceFlags::default(),
            conditioning: Conditioning::PoseConditioned,
        };

        let mut generator = WorkerGenerator::load(&spec).await.unwrap();
        let mut seed = crate::models::seed::SeedGenerator::new(1);
        let result = generator
            .generate(GenerationRequest {
                prompt: "p",
                negative_prompt: "n",
                image: image::DynamicImage::new_rgb8(2, 2),
                steps: 1,
                guidance_scale: 1.0,
                generator: &mut seed,
                strength: None,
            })
            .await;

        match result {
            Err(ModelError::Inference(message)) => assert_eq!(message, "CUDA out of memory"),
            other => panic!("Expected inference error, got {other:?}"),
        }
    }
}
