//! Configuration file loader for the `.vidstyle/` directory structure.
//!
//! This module provides functionality to load and parse:
//! - `.vidstyle/config.toml`: project-wide run defaults
//! - `.vidstyle/styles/*.md`: style presets with YAML front matter
//! - run file layers in TOML or YAML

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::models::AppConfig;
use gray_matter::engine::YAML;
use gray_matter::Matter;
use std::path::Path;
use vs_protocol::Style;
use walkdir::WalkDir;

/// Name of the project configuration directory.
pub const PROJECT_DIR: &str = ".vidstyle";

/// Loads all configuration from the `.vidstyle/` directory under `root`.
///
/// # Returns
///
/// An `AppConfig` holding the project layer and all style presets. Missing
/// directories or files yield an empty configuration rather than an error.
///
/// # Errors
///
/// Returns `ConfigError` if a file exists but cannot be read, or has
/// invalid TOML or front matter.
///
/// # Example
///
/// ```rust,no_run
/// use vs_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let app = load_config(Path::new(".")).await?;
/// let config = app.resolve(None, Some("watercolor"))?;
/// println!("{} fps, seed {}", config.target_fps, config.seed);
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let project_dir = root.join(PROJECT_DIR);

    if !project_dir.exists() {
        return Ok(AppConfig::default());
    }

    let config_path = project_dir.join("config.toml");
    let (project, project_path) = if config_path.exists() {
        (read_layer(&config_path)?, Some(config_path))
    } else {
        (toml::Table::new(), None)
    };

    let styles = load_styles(&project_dir)?;

    Ok(AppConfig {
        project,
        project_path,
        styles,
    })
}

/// Read a configuration file as a raw key/value layer.
pub(crate) fn read_layer(path: &Path) -> ConfigResult<toml::Table> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source,
        }),
        Some("yaml") | Some("yml") => {
            yaml_layer(&content).map_err(|source| ConfigError::YamlParse {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => Err(ConfigError::InvalidConfig {
            path: path.to_path_buf(),
            reason: "expected a .toml, .yaml or .yml file".to_string(),
        }),
    }
}

/// Parse a YAML layer. TOML has no null, so a `null` or `~` value means the
/// key is not set in this layer.
fn yaml_layer(content: &str) -> Result<toml::Table, serde_yaml::Error> {
    let mut value: serde_yaml::Value = serde_yaml::from_str(content)?;
    if value.is_null() {
        return Ok(toml::Table::new());
    }
    strip_nulls(&mut value);
    serde_yaml::from_value(value)
}

fn strip_nulls(value: &mut serde_yaml::Value) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            map.retain(|_, v| !v.is_null());
            for v in map.values_mut() {
                strip_nulls(v);
            }
        }
        serde_yaml::Value::Sequence(items) => items.iter_mut().for_each(strip_nulls),
        serde_yaml::Value::Tagged(tagged) => strip_nulls(&mut tagged.value),
        _ => {}
    }
}

/// Loads all style presets from `styles/*.md`.
fn load_styles(project_dir: &Path) -> ConfigResult<Vec<Style>> {
    let styles_dir = project_dir.join("styles");

    if !styles_dir.exists() {
        return Ok(Vec::new());
    }

    let mut styles = Vec::new();

    for entry in WalkDir::new(&styles_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: styles_dir.clone(),
            source,
        })?;

        let path = entry.path();

        if path.extension().and_then(|s| s.to_str()) != Some("md") {
            continue;
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let matter = Matter::<YAML>::new();
        let result = matter.parse(&content);

        let mut style: Style = result
            .data
            .ok_or_else(|| ConfigError::MarkdownParse {
                path: path.to_path_buf(),
                reason: "Missing YAML front matter".to_string(),
            })?
            .deserialize()
            .map_err(|e| ConfigError::MarkdownParse {
                path: path.to_path_buf(),
                reason: format!("Failed to deserialize front matter: {}", e),
            })?;

        // The body is the positive prompt
        style.prompt = result.content.trim().to_string();

        styles.push(style);
    }

    Ok(styles)
}
