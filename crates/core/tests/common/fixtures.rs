//! Test fixtures: an input clip, a fake ffmpeg and a matching run config.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vs_protocol::{RunConfig, ToolConfig};

/// A temporary project holding an input clip and a scripted ffmpeg.
pub struct TestProject {
    pub dir: TempDir,
    pub input: PathBuf,
    pub ffmpeg: PathBuf,
    /// Every ffmpeg command line, one per line.
    pub ffmpeg_log: PathBuf,
}

impl TestProject {
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    /// Run configuration wired to this project's clip and ffmpeg.
    pub fn config(&self) -> RunConfig {
        RunConfig {
            input_video: self.input.clone(),
            output_dir: self.output_dir(),
            target_width: 16,
            steps: 2,
            tools: ToolConfig {
                ffmpeg: self.ffmpeg.to_string_lossy().into_owned(),
                ..ToolConfig::default()
            },
            ..RunConfig::default()
        }
    }

    /// Recorded ffmpeg command lines.
    #[allow(dead_code)]
    pub fn ffmpeg_calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.ffmpeg_log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn transient_dir(&self) -> PathBuf {
        self.output_dir().join("temp")
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.output_dir().join("frames_out")
    }

    pub fn final_video(&self) -> PathBuf {
        self.output_dir().join("final_output.mp4")
    }

    /// Names of the files in the stylized frame directory, sorted.
    #[allow(dead_code)]
    pub fn stylized_frames(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.frames_dir())
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

/// Create a project whose ffmpeg "decodes" the clip into `frame_count`
/// copies of a small JPEG and "encodes" by writing a placeholder file.
///
/// With `fail` set, ffmpeg prints a diagnostic and exits with status 1.
#[cfg(unix)]
pub fn create_test_project(frame_count: u32) -> std::io::Result<TestProject> {
    create_project(frame_count, false)
}

#[cfg(unix)]
#[allow(dead_code)]
pub fn create_failing_project() -> std::io::Result<TestProject> {
    create_project(0, true)
}

#[cfg(unix)]
fn create_project(frame_count: u32, fail: bool) -> std::io::Result<TestProject> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let root = dir.path();

    let input = root.join("clip.mp4");
    std::fs::write(&input, b"not a real video")?;

    let sample = root.join("sample.jpg");
    write_sample_frame(&sample)?;

    let ffmpeg_log = root.join("ffmpeg.log");
    let ffmpeg = root.join("fake-ffmpeg");
    std::fs::write(&ffmpeg, fake_ffmpeg_script(&sample, &ffmpeg_log, frame_count, fail))?;
    std::fs::set_permissions(&ffmpeg, std::fs::Permissions::from_mode(0o755))?;

    Ok(TestProject {
        dir,
        input,
        ffmpeg,
        ffmpeg_log,
    })
}

fn write_sample_frame(path: &Path) -> std::io::Result<()> {
    let image = image::RgbImage::from_fn(16, 12, |x, y| image::Rgb([(x * 15) as u8, (y * 20) as u8, 128]));
    image.save(path).map_err(std::io::Error::other)
}

fn fake_ffmpeg_script(sample: &Path, log: &Path, frame_count: u32, fail: bool) -> String {
    if fail {
        return format!(
            "#!/bin/sh\necho \"$@\" >> '{}'\necho 'clip.mp4: Invalid data found when processing input' >&2\nexit 1\n",
            log.display()
        );
    }

    format!(
        r#"#!/bin/sh
echo "$@" >> '{log}'
for last; do :; done
case " $* " in
  *" -framerate "*)
    printf 'encoded' > "$last"
    ;;
  *)
    i=1
    while [ "$i" -le {count} ]; do
      cp '{sample}' "$(printf "$last" "$i")"
      i=$((i + 1))
    done
    ;;
esac
"#,
        log = log.display(),
        count = frame_count,
        sample = sample.display(),
    )
}
