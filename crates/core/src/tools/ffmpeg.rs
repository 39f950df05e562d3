//! Decode and encode invocations of the video tool.

use crate::frames::sequence_pattern;
use crate::tools::executor::ToolInvocation;
use std::path::Path;
use vs_protocol::ToolConfig;

/// Flags shared by every invocation: quiet output, errors only.
const COMMON_FLAGS: [&str; 4] = ["-hide_banner", "-loglevel", "error", "-y"];

fn base(tools: &ToolConfig) -> ToolInvocation {
    COMMON_FLAGS
        .iter()
        .fold(ToolInvocation::new(&tools.ffmpeg), |inv, flag| inv.arg(flag))
}

/// Resample `input` to `fps` and scale it to `width`, writing numbered
/// frames into `raw_dir`.
///
/// The height is derived from the aspect ratio and rounded to an even
/// number so the frames can later be encoded as yuv420p.
pub fn extract_frames(
    tools: &ToolConfig,
    input: &Path,
    raw_dir: &Path,
    fps: u32,
    width: u32,
    extension: &str,
) -> ToolInvocation {
    base(tools)
        .arg("-i")
        .arg(input)
        .arg("-vf")
        .arg(format!("fps={fps},scale={width}:-2"))
        .arg("-q:v")
        .arg(tools.frame_quality.to_string())
        .arg(sequence_pattern(raw_dir, extension))
}

/// Encode the first `frame_count` numbered frames of `frames_dir` into
/// `video` at `fps`.
pub fn assemble_video(
    tools: &ToolConfig,
    frames_dir: &Path,
    extension: &str,
    frame_count: usize,
    fps: u32,
    video: &Path,
) -> ToolInvocation {
    base(tools)
        .arg("-framerate")
        .arg(fps.to_string())
        .arg("-i")
        .arg(sequence_pattern(frames_dir, extension))
        .arg("-frames:v")
        .arg(frame_count.to_string())
        .arg("-c:v")
        .arg(&tools.video_codec)
        .arg("-pix_fmt")
        .arg("yuv420p")
        .arg(video)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_extract_arguments() {
        let invocation = extract_frames(
            &ToolConfig::default(),
            Path::new("clips/dance.mp4"),
            Path::new("output/temp/raw"),
            24,
            512,
            "jpg",
        );

        assert_eq!(invocation.program, "ffmpeg");
        insta::assert_debug_snapshot!(invocation.args_lossy(), @r#"
        [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-i",
            "clips/dance.mp4",
            "-vf",
            "fps=24,scale=512:-2",
            "-q:v",
            "2",
            "output/temp/raw/frame_%04d.jpg",
        ]
        "#);
    }

    #[cfg(unix)]
    #[test]
    fn test_assemble_arguments() {
        let tools = ToolConfig {
            ffmpeg: "/usr/local/bin/ffmpeg".to_string(),
            video_codec: "libx265".to_string(),
            ..ToolConfig::default()
        };
        let invocation = assemble_video(
            &tools,
            Path::new("output/frames_out"),
            "png",
            240,
            12,
            Path::new("output/final_output.mp4"),
        );

        assert_eq!(invocation.program, "/usr/local/bin/ffmpeg");
        insta::assert_debug_snapshot!(invocation.args_lossy(), @r#"
        [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-framerate",
            "12",
            "-i",
            "output/frames_out/frame_%04d.png",
            "-frames:v",
            "240",
            "-c:v",
            "libx265",
            "-pix_fmt",
            "yuv420p",
            "output/final_output.mp4",
        ]
        "#);
    }
}
