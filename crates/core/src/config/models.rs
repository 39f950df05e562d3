//! Configuration models that aggregate all settings.
//!
//! A run's configuration is built from layers, lowest precedence first:
//! built-in defaults, `.vidstyle/config.toml`, an explicit run file, a style
//! preset, and finally whatever the caller sets on the result.

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::loader::read_layer;
use std::path::{Path, PathBuf};
use vs_protocol::{RunConfig, Style};

/// Project configuration loaded from the `.vidstyle/` directory.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Raw `config.toml` layer; empty when the file is absent.
    pub project: toml::Table,

    /// Where `project` was read from, for error messages.
    pub project_path: Option<PathBuf>,

    /// Style presets loaded from `styles/*.md`, sorted by file name.
    pub styles: Vec<Style>,
}

impl AppConfig {
    pub fn style(&self, name: &str) -> Option<&Style> {
        self.styles.iter().find(|style| style.name == name)
    }

    /// Run configuration with only the project layer applied.
    pub fn defaults(&self) -> ConfigResult<RunConfig> {
        self.resolve(None, None)
    }

    /// Build a run configuration.
    ///
    /// `run_file` is layered over the project configuration key by key, so a
    /// run file only needs the keys it changes. The style preset named by
    /// `style` is applied last.
    ///
    /// # Errors
    ///
    /// Fails if the run file cannot be read or parsed, if the merged layers
    /// do not describe a valid `RunConfig`, or if the style does not exist.
    pub fn resolve(&self, run_file: Option<&Path>, style: Option<&str>) -> ConfigResult<RunConfig> {
        let mut table = self.project.clone();
        let mut origin = self
            .project_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("config.toml"));

        if let Some(path) = run_file {
            merge_tables(&mut table, read_layer(path)?);
            origin = path.to_path_buf();
        }

        let mut config: RunConfig = toml::Value::Table(table)
            .try_into()
            .map_err(|source| ConfigError::TomlParse {
                path: origin,
                source,
            })?;

        if let Some(name) = style {
            let preset = self.style(name).ok_or_else(|| ConfigError::UnknownStyle {
                name: name.to_string(),
                available: self.style_names(),
            })?;
            apply_style(&mut config, preset);
        }

        Ok(config)
    }

    fn style_names(&self) -> String {
        if self.styles.is_empty() {
            return "none".to_string();
        }
        self.styles
            .iter()
            .map(|style| style.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Override the generation parameters of `config` with those `style` sets.
///
/// An empty style body leaves the prompt unchanged.
pub fn apply_style(config: &mut RunConfig, style: &Style) {
    let prompt = style.prompt.trim();
    if !prompt.is_empty() {
        config.prompt = prompt.to_string();
    }
    if let Some(negative_prompt) = &style.negative_prompt {
        config.negative_prompt = negative_prompt.clone();
    }
    if let Some(steps) = style.steps {
        config.steps = steps;
    }
    if let Some(guidance_scale) = style.guidance_scale {
        config.guidance_scale = guidance_scale;
    }
    if let Some(denoising_strength) = style.denoising_strength {
        config.denoising_strength = denoising_strength;
    }
}

/// Merge `overlay` into `base`. Nested tables merge recursively, every other
/// value in `overlay` replaces the one in `base`.
pub(crate) fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
