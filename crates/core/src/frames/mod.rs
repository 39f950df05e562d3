//! Frame identifiers and on-disk frame sequences.
//!
//! Every stage names its files `frame_NNNN.<ext>` with a 1-based,
//! zero-padded index, so frame *i*'s raw, pose and output images can always
//! be matched by file name alone.

use image::DynamicImage;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// File name prefix shared by all frame files.
pub const FRAME_PREFIX: &str = "frame_";

/// Minimum number of digits in a frame index.
pub const INDEX_WIDTH: usize = 4;

/// 1-based index of a frame within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(u32);

impl FrameId {
    /// Returns `None` for 0; indices start at 1.
    pub fn new(index: u32) -> Option<Self> {
        (index > 0).then_some(Self(index))
    }

    pub fn index(self) -> u32 {
        self.0
    }

    /// File name of this frame, e.g. `frame_0007.jpg`.
    pub fn file_name(self, extension: &str) -> String {
        format!("{FRAME_PREFIX}{:0width$}.{extension}", self.0, width = INDEX_WIDTH)
    }

    /// Path of this frame inside `dir`.
    pub fn path_in(self, dir: &Path, extension: &str) -> PathBuf {
        dir.join(self.file_name(extension))
    }

    /// Parse a frame file name. Names with another prefix or extension,
    /// a non-numeric index, or index 0 are rejected.
    pub fn parse(file_name: &str, extension: &str) -> Option<Self> {
        let digits = file_name
            .strip_prefix(FRAME_PREFIX)?
            .strip_suffix(extension)?
            .strip_suffix('.')?;
        if digits.len() < INDEX_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().and_then(Self::new)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// printf-style pattern understood by the decode/encode tool.
pub fn sequence_pattern(dir: &Path, extension: &str) -> PathBuf {
    dir.join(format!("{FRAME_PREFIX}%0{INDEX_WIDTH}d.{extension}"))
}

/// Errors raised while reading a frame directory.
#[derive(Error, Debug)]
pub enum SequenceError {
    #[error("Failed to read frame directory {path}: {source}")]
    DirectoryWalk {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// The indices found are not exactly 1..=N.
    #[error("Frame sequence in {path} is not contiguous: expected frame {expected}, found frame {found}")]
    Gap {
        path: PathBuf,
        expected: u32,
        found: u32,
    },
}

/// Ordered, contiguous set of frames 1..=N.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameSequence {
    ids: Vec<FrameId>,
}

impl FrameSequence {
    /// Sequence of `count` frames starting at 1.
    pub fn with_len(count: u32) -> Self {
        Self {
            ids: (1..=count).map(FrameId).collect(),
        }
    }

    /// Read the frame files directly inside `dir`.
    ///
    /// Files that do not follow the frame naming scheme are ignored. The
    /// indices found must form 1..=N without gaps.
    pub fn scan(dir: &Path, extension: &str) -> Result<Self, SequenceError> {
        let mut ids = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|source| SequenceError::DirectoryWalk {
                path: dir.to_path_buf(),
                source,
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            if let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| FrameId::parse(name, extension))
            {
                ids.push(id);
            }
        }

        ids.sort_unstable();

        for (position, id) in ids.iter().enumerate() {
            let expected = position as u32 + 1;
            if id.index() != expected {
                return Err(SequenceError::Gap {
                    path: dir.to_path_buf(),
                    expected,
                    found: id.index(),
                });
            }
        }

        Ok(Self { ids })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.ids.iter().copied()
    }

    /// First id of this sequence missing from `dir`, if any.
    pub fn first_missing_in(&self, dir: &Path, extension: &str) -> Option<FrameId> {
        self.iter()
            .find(|id| !id.path_in(dir, extension).is_file())
    }
}

/// Decode an image file off the async runtime.
pub async fn load_frame(path: PathBuf) -> Result<DynamicImage, image::ImageError> {
    match tokio::task::spawn_blocking(move || image::open(path)).await {
        Ok(result) => result,
        Err(join) => Err(image::ImageError::IoError(std::io::Error::other(join))),
    }
}

/// Encode an image file off the async runtime. The format follows the
/// extension of `path`; JPEG output drops any alpha channel first.
pub async fn save_frame(image: DynamicImage, path: PathBuf) -> Result<(), image::ImageError> {
    let task = tokio::task::spawn_blocking(move || {
        let is_jpeg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
        if is_jpeg && image.color().has_alpha() {
            DynamicImage::ImageRgb8(image.to_rgb8()).save(&path)
        } else {
            image.save(&path)
        }
    });

    match task.await {
        Ok(result) => result,
        Err(join) => Err(image::ImageError::IoError(std::io::Error::other(join))),
    }
}
