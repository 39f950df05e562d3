//! Embedded template files for .vidstyle initialization.
//!
//! The repository's `templates/` directory is embedded into the binary at
//! compile time, so `vidstyle init` works without any files next to the
//! executable.

use rust_embed::RustEmbed;

/// Embedded template files from the `templates/` directory.
///
/// - `CARGO_MANIFEST_DIR` = `crates/core`
/// - `../../templates` = repository root `templates/`
///
/// With the `debug-embed` feature, debug builds embed the files as well
/// instead of reading them from disk.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../templates"]
pub struct TemplateAssets;

/// Get template file content by path.
///
/// # Example
/// ```
/// use vs_core::init::templates::get_template;
///
/// let config = get_template("config.toml").expect("config.toml should exist");
/// assert!(config.contains("target-fps ="));
/// ```
pub fn get_template(path: &str) -> Option<String> {
    TemplateAssets::get(path).map(|file| String::from_utf8_lossy(file.data.as_ref()).to_string())
}

/// List all template files under `prefix`, sorted.
///
/// # Example
/// ```
/// use vs_core::init::templates::list_templates;
///
/// let styles = list_templates("styles/");
/// assert!(styles.contains(&"styles/anime.md".to_string()));
/// ```
pub fn list_templates(prefix: &str) -> Vec<String> {
    let mut paths: Vec<String> = TemplateAssets::iter()
        .filter(|path| path.starts_with(prefix))
        .map(|path| path.to_string())
        .collect();
    paths.sort();
    paths
}
