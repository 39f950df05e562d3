use std::path::PathBuf;
use vs_protocol::*;

#[test]
fn test_run_config_from_partial_toml_keeps_defaults() {
    let toml_str = r#"
input-video = "clips/dance.mp4"
target-fps = 12
pose-mode = false

[model]
backend = "reference"

[performance]
low-vram = true
attention = "xformers"
"#;

    let config: RunConfig = toml::from_str(toml_str).expect("Failed to deserialize RunConfig");

    assert_eq!(config.input_video, PathBuf::from("clips/dance.mp4"));
    assert_eq!(config.target_fps, 12);
    assert!(!config.pose_mode);
    assert_eq!(config.model.backend, BackendKind::Reference);
    assert!(config.performance.low_vram);
    assert_eq!(config.performance.attention, Some(AttentionBackend::Xformers));

    // Untouched fields fall back to defaults
    assert_eq!(config.target_width, 512);
    assert_eq!(config.seed, 12345);
    assert_eq!(config.steps, 20);
    assert_eq!(config.output_dir, PathBuf::from("output"));
    assert_eq!(config.model.base_model, "runwayml/stable-diffusion-v1-5");
    assert_eq!(config.tools.ffmpeg, "ffmpeg");
    assert_eq!(config.workspace.frames_dir, "frames_out");
}

#[test]
fn test_run_config_from_yaml() {
    let yaml_str = r#"
input-video: in.mov
output-dir: /tmp/out
seed: 7
denoising-strength: 0.4
model:
  weights: models/custom.safetensors
  worker:
    program: /opt/worker/bin/run
    args: ["--device", "cuda:0"]
workspace:
  frame-extension: png
"#;

    let config: RunConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize RunConfig");

    assert_eq!(config.seed, 7);
    assert!((config.denoising_strength - 0.4).abs() < f32::EPSILON);
    assert_eq!(
        config.model.weights,
        Some(PathBuf::from("models/custom.safetensors"))
    );
    assert_eq!(config.model.worker.program, "/opt/worker/bin/run");
    assert_eq!(config.model.worker.args, vec!["--device", "cuda:0"]);
    assert_eq!(config.workspace.frame_extension, "png");
    assert_eq!(config.workspace.transient_dir, "temp");
}

#[test]
fn test_run_config_json_roundtrip() {
    let config = RunConfig {
        input_video: PathBuf::from("a.mp4"),
        prompt: "ink drawing".to_string(),
        ..RunConfig::default()
    };

    let json = serde_json::to_string(&config).expect("Failed to serialize RunConfig");
    assert!(json.contains("\"input-video\":\"a.mp4\""));

    let back: RunConfig = serde_json::from_str(&json).expect("Failed to deserialize RunConfig");
    assert_eq!(back, config);
}

#[test]
fn test_style_front_matter_fields() {
    let yaml_str = r#"
name: watercolor
description: Soft watercolor painting
negative-prompt: photo
steps: 25
"#;

    let style: Style = serde_yaml::from_str(yaml_str).expect("Failed to deserialize Style");

    assert_eq!(style.name, "watercolor");
    assert_eq!(style.negative_prompt.as_deref(), Some("photo"));
    assert_eq!(style.steps, Some(25));
    assert_eq!(style.guidance_scale, None);
    assert!(style.prompt.is_empty(), "prompt comes from the markdown body");
}

#[test]
fn test_event_serialization_is_tagged() {
    let run_id = uuid::Uuid::new_v4();
    let event = Event::Progress {
        run_id,
        percent: 42,
        status: "Stylizing frame 3/10".to_string(),
    };

    let json = serde_json::to_value(&event).expect("Failed to serialize Event");
    assert_eq!(json["type"], "progress");
    assert_eq!(json["payload"]["percent"], 42);
    assert_eq!(json["payload"]["run_id"], run_id.to_string());

    let back: Event = serde_json::from_value(json).expect("Failed to deserialize Event");
    assert_eq!(back.run_id(), run_id);
    assert!(!back.is_terminal());
}

#[test]
fn test_terminal_events() {
    let run_id = uuid::Uuid::new_v4();

    assert!(Event::RunCancelled { run_id }.is_terminal());
    assert!(Event::RunError {
        run_id,
        error: "boom".to_string()
    }
    .is_terminal());
    assert!(!Event::StageStarted {
        run_id,
        stage: Stage::Extract
    }
    .is_terminal());
}

#[test]
fn test_disposition_status_and_shape() {
    let completed = RunDisposition::Completed {
        final_video: PathBuf::from("output/final_output.mp4"),
        frame_count: 10,
    };
    assert_eq!(completed.status(), RunStatus::Completed);
    assert_eq!(RunDisposition::Cancelled.status(), RunStatus::Cancelled);

    let failed = RunDisposition::Failed {
        reason: "no frames".to_string(),
    };
    let json = serde_json::to_value(&failed).expect("Failed to serialize RunDisposition");
    assert_eq!(json["kind"], "failed");
    assert_eq!(json["reason"], "no frames");

    assert!(RunStatus::Failed.is_terminal());
    assert!(!RunStatus::Running.is_terminal());
}

#[test]
fn test_stage_labels() {
    assert_eq!(Stage::Stylize.to_string(), "stylize");
    let json = serde_json::to_string(&Stage::Assemble).expect("Failed to serialize Stage");
    assert_eq!(json, "\"assemble\"");
}
