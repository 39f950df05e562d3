//! Directory structure and file generation for .vidstyle initialization.

use super::error::{InitError, InitResult};
use super::templates::{get_template, list_templates};
use crate::config::PROJECT_DIR;
use std::fs;
use std::path::{Path, PathBuf};

/// Style written by `--minimal`.
const MINIMAL_STYLE: &str = "styles/anime.md";

/// Options for initializing a .vidstyle directory.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Directory the .vidstyle directory is created in.
    pub target_dir: PathBuf,

    /// Overwrite an existing .vidstyle directory.
    pub force: bool,

    /// Only write the configuration and a single style.
    pub minimal: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            force: false,
            minimal: false,
        }
    }
}

/// Generate a .vidstyle directory populated from the embedded templates.
///
/// ```text
/// .vidstyle/
/// ├── config.toml
/// └── styles/
///     ├── anime.md
///     ├── sketch.md      (unless minimal)
///     └── watercolor.md  (unless minimal)
/// ```
///
/// Returns the written files, in the order they were written.
///
/// # Errors
///
/// Fails if the directory already exists and `force` is not set, or if a
/// file system operation fails.
pub async fn generate_project_structure(options: InitOptions) -> InitResult<Vec<PathBuf>> {
    let project_dir = options.target_dir.join(PROJECT_DIR);

    if project_dir.exists() && !options.force {
        return Err(InitError::DirectoryExists(project_dir));
    }

    let styles_dir = project_dir.join("styles");
    fs::create_dir_all(&styles_dir).map_err(|source| InitError::DirectoryCreate {
        path: styles_dir.clone(),
        source,
    })?;

    let mut templates = vec!["config.toml".to_string()];
    if options.minimal {
        templates.push(MINIMAL_STYLE.to_string());
    } else {
        templates.extend(list_templates("styles/"));
    }

    let mut written = Vec::with_capacity(templates.len());
    for template in &templates {
        written.push(write_template_file(&project_dir, template)?);
    }

    tracing::debug!(dir = %project_dir.display(), files = written.len(), "Project initialized");
    Ok(written)
}

fn write_template_file(project_dir: &Path, template_path: &str) -> InitResult<PathBuf> {
    let content = get_template(template_path)
        .ok_or_else(|| InitError::TemplateNotFound(template_path.to_string()))?;

    let target_path = project_dir.join(template_path);

    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|source| InitError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&target_path, content).map_err(|source| InitError::FileWrite {
        path: target_path.clone(),
        source,
    })?;

    Ok(target_path)
}
